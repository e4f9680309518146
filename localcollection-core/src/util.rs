/// Normalize a free-text name for storage and comparison.
///
/// Trims the ends, collapses every internal run of whitespace to a single
/// space, and lowercases the result. Artist names, tag names and titles all
/// go through this before they touch the database.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Seconds in one day, used for tag-age arithmetic.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_name("  Queen "), "queen");
        assert_eq!(normalize_name("The\tBeatles"), "the beatles");
        assert_eq!(normalize_name("Led   Zeppelin\n"), "led zeppelin");
    }

    #[test]
    fn normalize_empty_and_blank() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   \t "), "");
    }

    #[test]
    fn normalize_non_ascii() {
        assert_eq!(normalize_name("Sigur RÓS"), "sigur rós");
    }
}
