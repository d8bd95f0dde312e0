//! Model-name normalization and id derivation.
//!
//! `model_key` produces the join key against the dealer override file.
//! Brand removal is substring-based on purpose: the source data embeds the
//! brand anywhere in the model string, so a mid-string occurrence is
//! stripped too. The key is not guaranteed unique.

use regex::Regex;

use crate::model::ExtractError;

/// Join key for the override map: every occurrence of the brand token
/// removed (case-insensitive), non-alphanumerics dropped, lowercased.
/// Idempotent.
pub fn model_key(raw: &str, brand: &str) -> String {
    let cleaned = if brand.is_empty() {
        raw.to_string()
    } else {
        let re = Regex::new(&format!("(?i){}", regex::escape(brand)))
            .expect("escaped brand token is a valid regex");
        re.replace_all(raw, "").into_owned()
    };
    cleaned
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Display-name cleanup: strip a leading brand token with an optional `-`
/// separator, then any remaining inline occurrences, and trim.
pub fn strip_brand_prefix(text: &str, brand: &str) -> String {
    if brand.is_empty() {
        return text.trim().to_string();
    }
    let escaped = regex::escape(brand);
    let mut out = text.trim().to_string();
    let leading = Regex::new(&format!("(?i)^{escaped}-?")).expect("valid brand regex");
    if leading.is_match(&out) {
        out = leading.replace(&out, "").trim().to_string();
    }
    let inline = Regex::new(&format!("(?i){escaped}-?")).expect("valid brand regex");
    inline.replace_all(&out, "").trim().to_string()
}

/// Last non-empty path segment of `link`.
pub fn last_path_segment(link: &str) -> Option<&str> {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    path.split('/').filter(|part| !part.is_empty()).next_back()
}

/// Derive the record id from its link: last non-empty path segment with
/// the brand code prefixed (never doubled).
pub fn derive_id(brand: &str, link: &str) -> Result<String, ExtractError> {
    let segment = last_path_segment(link).ok_or(ExtractError::MissingField("id"))?;
    let tail = strip_brand_prefix(segment, brand);
    if tail.is_empty() {
        // The whole segment was the brand token; keep the bare prefix
        // rather than emitting "brand-".
        return Ok(brand.to_string());
    }
    Ok(format!("{brand}-{}", tail.to_lowercase()))
}

/// Reduce a price text to its digits: "5 000 000 ₽" -> "5000000".
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_key_strips_brand_and_punctuation() {
        assert_eq!(model_key("BMW X5", "bmw"), "x5");
        assert_eq!(model_key("Atlas Pro", "geely"), "atlaspro");
        assert_eq!(model_key("Geely Atlas-Pro!", "geely"), "atlaspro");
    }

    #[test]
    fn model_key_strips_mid_string_brand() {
        assert_eq!(model_key("New GEELY Coolray", "geely"), "newcoolray");
    }

    #[test]
    fn model_key_is_idempotent() {
        for (raw, brand) in [
            ("BMW X5", "bmw"),
            ("Geely Atlas Pro", "geely"),
            ("Tiggo 7 Pro Max", "chery"),
            ("", "bmw"),
        ] {
            let once = model_key(raw, brand);
            assert_eq!(model_key(&once, brand), once);
        }
    }

    #[test]
    fn strip_brand_prefix_variants() {
        assert_eq!(strip_brand_prefix("BMW X5", "bmw"), "X5");
        assert_eq!(strip_brand_prefix("bmw-x5", "bmw"), "x5");
        assert_eq!(strip_brand_prefix("X5", "bmw"), "X5");
        assert_eq!(strip_brand_prefix("  Chery Tiggo  ", "chery"), "Tiggo");
    }

    #[test]
    fn derive_id_from_link() {
        assert_eq!(derive_id("bmw", "/model/x5/").unwrap(), "bmw-x5");
        assert_eq!(derive_id("bmw", "https://x.ru/model/X5").unwrap(), "bmw-x5");
        // already prefixed segments are not doubled
        assert_eq!(derive_id("bmw", "/model/bmw-x5/").unwrap(), "bmw-x5");
    }

    #[test]
    fn derive_id_rejects_empty_tail() {
        assert!(derive_id("bmw", "").is_err());
        assert!(derive_id("bmw", "///").is_err());
    }

    #[test]
    fn digits_only_drops_currency_and_spaces() {
        assert_eq!(digits_only("5 000 000 ₽"), "5000000");
        assert_eq!(digits_only("от 1\u{a0}999\u{a0}900 ₽"), "1999900");
        assert_eq!(digits_only("нет цены"), "");
    }
}
