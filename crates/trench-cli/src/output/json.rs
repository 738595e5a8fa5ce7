use serde::Serialize;
use trench_core::error::TrenchError;

pub fn print<T: Serialize>(value: &T) -> Result<(), TrenchError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
