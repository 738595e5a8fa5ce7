use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{2})[./-]([0-9]{2})[./-]([0-9]{4})").unwrap());

/// Normalize a `dd.mm.yyyy`, `dd-mm-yyyy` or `dd/mm/yyyy` date to `dd/mm/yyyy`.
///
/// Returns an empty string when no date is present.
pub fn normalize_date(s: &str) -> String {
    DATE.captures(s)
        .map(|c| format!("{}/{}/{}", &c[1], &c[2], &c[3]))
        .unwrap_or_default()
}

/// First date captured by `pattern` (group 1) within the first `max_lines` lines.
///
/// `max_lines` of None scans the whole text.
pub fn date_near_anchor(text: &str, pattern: &Regex, max_lines: Option<usize>) -> String {
    let limit = max_lines.unwrap_or(usize::MAX);
    text.lines()
        .take(limit)
        .find_map(|line| pattern.captures(line))
        .and_then(|c| c.get(1))
        .map(|m| normalize_date(m.as_str()))
        .unwrap_or_default()
}

/// Whole days elapsed from a `dd/mm/yyyy` date to `today`. Empty when unparseable.
pub fn days_since(date: &str, today: NaiveDate) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y") {
        Ok(d) => (today - d).num_days().to_string(),
        Err(_) => String::new(),
    }
}
