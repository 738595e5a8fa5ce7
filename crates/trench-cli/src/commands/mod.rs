pub mod lookup;
pub mod parse;
pub mod profile;
pub mod tables;
