//! Field extractors: pure functions from text and table grids to field values.
//!
//! Every extractor is total. A value that cannot be found yields an empty
//! string, never an error, so one missing field never blocks the rest of
//! the row.

pub mod application;
pub mod dates;
pub mod grid;
pub mod mbmc;
pub mod mcgm;
pub mod numeric;

use crate::model::{Authority, FieldKey};

/// Fields an authority's extractor battery produces. Empty for authorities
/// without a parser.
pub fn extractable_fields(authority: Authority) -> &'static [FieldKey] {
    match authority {
        Authority::Mcgm => mcgm::EXTRACTED_FIELDS,
        Authority::Mbmc => mbmc::EXTRACTED_FIELDS,
        Authority::Kdmc | Authority::MidcType1 | Authority::MidcType2 | Authority::Nmmc => &[],
    }
}

/// Up to `max_chars` characters of `text` starting at byte offset `start`.
///
/// `start` must sit on a char boundary (regex and `match_indices` offsets do).
pub(crate) fn text_after(text: &str, start: usize, max_chars: usize) -> &str {
    let rest = text.get(start..).unwrap_or("");
    match rest.char_indices().nth(max_chars) {
        Some((end, _)) => &rest[..end],
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_authorities_extract_nothing() {
        assert!(extractable_fields(Authority::Nmmc).is_empty());
        assert!(extractable_fields(Authority::Mcgm).contains(&FieldKey::RoadTypes));
        assert!(!extractable_fields(Authority::Mbmc).contains(&FieldKey::RowApplicationDate));
    }

    #[test]
    fn test_text_after_respects_char_boundaries() {
        assert_eq!(text_after("abc₹def", 2, 3), "c₹d");
        assert_eq!(text_after("abc", 1, 100), "bc");
        assert_eq!(text_after("abc", 10, 5), "");
    }
}
