//! Embedded-JSON strategy: the site inlines its menu model as a JSON blob
//! inside the HTML. A configured regex pulls the blob out (capture group 1),
//! then a key path leads to the card array.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::CardExtractor;
use crate::model::{ExtractError, RawCard};
use crate::normalize;

static BENEFIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"выгода\s+до\s+([\d\s]+)\s*₽").expect("valid benefit regex"));

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d\s]+)\s*₽").expect("valid amount regex"));

pub struct EmbeddedJsonExtractor {
    pattern: Regex,
    cards_path: String,
}

impl EmbeddedJsonExtractor {
    pub fn new(pattern: &str, cards_path: &str) -> Result<Self, ExtractError> {
        let pattern =
            Regex::new(pattern).map_err(|e| ExtractError::BadSelector(e.to_string()))?;
        Ok(Self {
            pattern,
            cards_path: cards_path.to_string(),
        })
    }
}

impl CardExtractor for EmbeddedJsonExtractor {
    fn extract(&self, html: &str, _page_url: &str) -> Result<Vec<RawCard>, ExtractError> {
        let capture = self
            .pattern
            .captures(html)
            .and_then(|c| c.get(1))
            .ok_or(ExtractError::RegexMismatch)?;
        let blob: Value = serde_json::from_str(capture.as_str())?;

        let cards = lookup(&blob, &self.cards_path)
            .and_then(Value::as_array)
            .ok_or_else(|| ExtractError::MissingPath(self.cards_path.clone()))?;

        let mut out = Vec::with_capacity(cards.len());
        for card in cards {
            let Some(model) = string_at(card, "title.text.value") else {
                warn!("card without title, skipped");
                continue;
            };
            let Some(link) = string_at(card, "link.url") else {
                warn!(%model, "card without link, skipped");
                continue;
            };
            let price_text = string_at(card, "price.value").unwrap_or_default();
            let (benefit, price) = price_and_benefit(&price_text);
            out.push(RawCard {
                id: None,
                model,
                price: price.to_string(),
                benefit: benefit.to_string(),
                link,
            });
        }
        Ok(out)
    }
}

/// Marketing price text carries several "N ₽" amounts (old price, discounted
/// price) and possibly a "выгода до N ₽" clause. The benefit is removed
/// first so its amount does not compete for the minimum.
fn price_and_benefit(raw: &str) -> (u64, u64) {
    let text = raw.to_lowercase();
    let (benefit, clean) = match BENEFIT_RE.captures(&text) {
        Some(caps) => {
            let amount = parse_spaced(&caps[1]);
            (amount, BENEFIT_RE.replace(&text, "").into_owned())
        }
        None => (0, text),
    };
    let min_price = AMOUNT_RE
        .captures_iter(&clean)
        .map(|c| parse_spaced(&c[1]))
        .filter(|&n| n > 0)
        .min();
    let price = match min_price {
        Some(p) => p,
        None => {
            // Fall back to a bare digit scan for texts without a currency sign.
            let digits = normalize::digits_only(&clean);
            if digits.is_empty() {
                warn!(raw, "no price found in text");
            }
            digits.parse().unwrap_or(0)
        }
    };
    (benefit, price)
}

fn parse_spaced(text: &str) -> u64 {
    normalize::digits_only(text).parse().unwrap_or(0)
}

/// Walk a dotted key path with optional indices: `a.b[0].c`.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.split('.') {
        let (key, indices) = split_indices(segment)?;
        if !key.is_empty() {
            node = node.get(key)?;
        }
        for idx in indices {
            node = node.get(idx)?;
        }
    }
    Some(node)
}

fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    match segment.find('[') {
        None => Some((segment, Vec::new())),
        Some(at) => {
            let key = &segment[..at];
            let mut indices = Vec::new();
            for part in segment[at..].split('[').filter(|p| !p.is_empty()) {
                let num = part.strip_suffix(']')?;
                indices.push(num.parse().ok()?);
            }
            Some((key, indices))
        }
    }
}

fn string_at(card: &Value, path: &str) -> Option<String> {
    lookup(card, path)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
