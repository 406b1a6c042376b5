use regex::Regex;
use std::sync::LazyLock;

/// Unit token for "gram" as it appears in marketplace titles.
pub const GRAM_UNIT: &str = "گرم";

// ASCII, Persian and Arabic-Indic digits only; those are the scripts
// `normalize_char` folds to ASCII.
const DIGIT_CLASS: &str = "[0-9۰-۹٠-٩]";

static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"({d}+(?:[.,٫]{d}*)?)\s*{unit}",
        d = DIGIT_CLASS,
        unit = regex::escape(GRAM_UNIT)
    );
    Regex::new(&pattern).expect("weight pattern is valid")
});

/// Extracts the gold weight in grams from a product title.
///
/// Returns `None` when the title carries no `<number> گرم` expression. The
/// extraction is purely syntactic, so `"0 گرم"` yields `Some(0.0)`.
pub fn extract_weight(title: &str) -> Option<f64> {
    let captures = WEIGHT_RE.captures(title)?;
    let numeral = captures.get(1)?.as_str();
    parse_localized_number(numeral)
}

/// Parses a numeral that may use localized digits or decimal separators.
pub fn parse_localized_number(numeral: &str) -> Option<f64> {
    let normalized: String = numeral
        .trim()
        .chars()
        .map(normalize_char)
        .collect();
    let normalized = normalized.trim_end_matches('.');
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok()
}

fn normalize_char(c: char) -> char {
    match c {
        ',' | '٫' => '.',
        '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
        '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_decimal_weight_with_period() {
        assert_eq!(extract_weight("انگشتر طلا 5.5 گرم"), Some(5.5));
        assert_eq!(extract_weight("Ring 5.5 گرم"), Some(5.5));
    }

    #[test]
    fn normalizes_decimal_comma() {
        assert_eq!(extract_weight("Ring 5,5 گرم"), Some(5.5));
        assert_eq!(extract_weight("دستبند ۲٫۵ گرم"), Some(2.5));
    }

    #[test]
    fn accepts_missing_whitespace_before_unit() {
        assert_eq!(extract_weight("گردنبند 0.98گرم 18 عیار"), Some(0.98));
    }

    #[test]
    fn folds_persian_and_arabic_digits() {
        assert_eq!(extract_weight("آویز ۳ گرم"), Some(3.0));
        assert_eq!(extract_weight("آویز ٤.٢٥ گرم"), Some(4.25));
    }

    #[test]
    fn takes_first_match_anywhere_in_title() {
        assert_eq!(extract_weight("ست 2 گرم و 3 گرم"), Some(2.0));
    }

    #[test]
    fn returns_none_without_weight() {
        assert_eq!(extract_weight("Ring with no weight"), None);
        assert_eq!(extract_weight("گوشواره 18 عیار"), None);
        assert_eq!(extract_weight(""), None);
    }

    #[test]
    fn zero_weight_is_not_rejected() {
        assert_eq!(extract_weight("نمونه 0 گرم"), Some(0.0));
    }

    #[test]
    fn digits_from_other_scripts_are_not_part_of_the_weight() {
        assert_eq!(extract_weight("کد १5 گرم"), Some(5.0));
        assert_eq!(extract_weight("१२ گرم"), None);
    }

    #[test]
    fn trailing_separator_is_ignored() {
        assert_eq!(extract_weight("Ring 7. گرم"), Some(7.0));
    }
}
