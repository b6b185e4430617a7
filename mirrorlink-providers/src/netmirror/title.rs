//! Title normalization for candidate matching

use std::sync::LazyLock;

use regex::Regex;

static RE_QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['":]"#).expect("invalid quotes regex"));
static RE_NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("invalid separator regex"));

const SUFFIXES: [&str; 2] = ["the movie", "the series"];

/// Normalize a title so cosmetic differences (case, punctuation, a trailing
/// "the movie"/"the series") do not affect comparison.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let mut trimmed = title.trim().to_lowercase();
    for suffix in SUFFIXES {
        if trimmed != suffix && trimmed.ends_with(suffix) {
            trimmed.truncate(trimmed.len() - suffix.len());
            trimmed.truncate(trimmed.trim_end().len());
        }
    }
    let unquoted = RE_QUOTES.replace_all(&trimmed, "");
    RE_NON_ALNUM.replace_all(&unquoted, "_").into_owned()
}

#[must_use]
pub fn compare_title(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        assert_eq!(normalize_title("  Spider-Man: No Way Home "), "spider_man_no_way_home");
        assert_eq!(normalize_title("Ocean's Eleven"), "oceans_eleven");
    }

    #[test]
    fn test_suffix_removed() {
        assert!(compare_title("Dragon Ball Super: The Movie", "Dragon Ball Super"));
        assert!(compare_title("Arcane The Series", "arcane"));
        assert_eq!(normalize_title("The Movie"), "the_movie");
    }

    #[test]
    fn test_different_titles() {
        assert!(!compare_title("Dark", "Dark Matter"));
        assert!(compare_title("DARK", "dark"));
    }
}
