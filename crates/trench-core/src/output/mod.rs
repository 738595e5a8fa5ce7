pub mod xlsx;

/// Used in filenames when the reference number could not be extracted.
pub const FALLBACK_REFERENCE: &str = "UnknownDemandNote";

/// Replace every character outside `[A-Za-z0-9_-]` with an underscore.
pub fn sanitize_filename(reference: &str) -> String {
    reference
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_stem(reference: &str) -> String {
    let clean = sanitize_filename(reference);
    if clean.is_empty() {
        FALLBACK_REFERENCE.to_string()
    } else {
        clean
    }
}

/// `{ref}_Non Refundable Output.xlsx`
pub fn non_refundable_filename(reference: &str) -> String {
    format!("{}_Non Refundable Output.xlsx", file_stem(reference))
}

/// `{ref}_SD Output.xlsx`
pub fn sd_filename(reference: &str) -> String {
    format!("{}_SD Output.xlsx", file_stem(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_hyphen_replaces_slash() {
        assert_eq!(sanitize_filename("MU-1608/25-26"), "MU-1608_25-26");
        assert_eq!(sanitize_filename("MBMC/PWD 1"), "MBMC_PWD_1");
        assert_eq!(sanitize_filename("a_b"), "a_b");
    }

    #[test]
    fn test_filenames_fall_back_when_reference_missing() {
        assert_eq!(
            non_refundable_filename(""),
            "UnknownDemandNote_Non Refundable Output.xlsx"
        );
        assert_eq!(sd_filename("  "), "UnknownDemandNote_SD Output.xlsx");
        assert_eq!(sd_filename("CHE/1"), "CHE_1_SD Output.xlsx");
    }
}
