//! Dealer override reconciliation: scraped prices are merged against a
//! locally maintained per-model override file. The lower price wins; the
//! benefit direction is a configured policy.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::{BenefitPolicy, OverrideSettings};
use crate::model::Listing;
use crate::normalize;

pub struct OverrideMap {
    entries: HashMap<String, Value>,
    price_field: String,
    benefit_field: Option<String>,
    benefit_policy: Option<BenefitPolicy>,
}

impl OverrideMap {
    pub fn new(entries: HashMap<String, Value>, settings: &OverrideSettings) -> Self {
        Self {
            entries,
            price_field: settings.price_field.clone(),
            benefit_field: settings.benefit_field.clone(),
            benefit_policy: settings.benefit_policy,
        }
    }

    /// Merge one listing in place. Records with no override entry pass
    /// through unchanged.
    pub fn reconcile(&self, listing: &mut Listing) {
        let brand = listing.brand.as_deref().unwrap_or("");
        let key = normalize::model_key(&listing.model, brand);
        let Some(entry) = self.entries.get(&key) else {
            return;
        };

        if let Some(override_price) = field_text(entry, &self.price_field) {
            match override_price.parse::<u64>() {
                Ok(dealer) => {
                    let scraped = parse_or_max(&listing.price);
                    let merged = scraped.min(dealer);
                    if merged.to_string() != listing.price {
                        info!(
                            id = %listing.id,
                            scraped = %listing.price,
                            dealer,
                            "price overridden by dealer file"
                        );
                    }
                    listing.price = merged.to_string();
                }
                Err(_) => warn!(
                    %key,
                    value = %override_price,
                    "unparseable dealer price, ignored"
                ),
            }
        }

        if let (Some(field), Some(policy)) = (&self.benefit_field, self.benefit_policy) {
            if let Some(override_benefit) = field_text(entry, field) {
                let dealer = override_benefit.parse::<u64>().unwrap_or_else(|_| {
                    warn!(%key, value = %override_benefit, "unparseable dealer benefit, using 0");
                    0
                });
                let scraped = listing.benefit.parse::<u64>().unwrap_or(0);
                listing.benefit = policy.combine(scraped, dealer).to_string();
            }
        }
    }
}

/// A scraped price that does not parse must not beat a dealer price in the
/// min comparison, so it degrades to the maximum.
fn parse_or_max(price: &str) -> u64 {
    match price.parse::<u64>() {
        Ok(n) => n,
        Err(_) => {
            if !price.is_empty() && price != "0" {
                warn!(price, "unparseable scraped price, treating as +inf");
            }
            u64::MAX
        }
    }
}

/// Override entries come from hand-edited JSON or the CSV converter, so a
/// field may be a string or a number.
fn field_text(entry: &Value, field: &str) -> Option<String> {
    let text = match entry.get(field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Repair for a known upstream defect: broken markup occasionally glues two
/// price tiers into one numeral. Above the threshold the digit string is
/// split at its midpoint and the smaller half kept. Best-effort only.
pub fn split_glued_price(digits: &str, threshold: u64) -> String {
    let Ok(value) = digits.parse::<u64>() else {
        return digits.to_string();
    };
    if value <= threshold {
        return digits.to_string();
    }
    let mid = digits.len() / 2;
    let (first, second) = digits.split_at(mid);
    match (first.parse::<u64>(), second.parse::<u64>()) {
        (Ok(a), Ok(b)) => {
            let kept = a.min(b);
            warn!(digits, kept, "glued price split at midpoint");
            kept.to_string()
        }
        _ => digits.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn settings(benefit: bool, policy: Option<BenefitPolicy>) -> OverrideSettings {
        OverrideSettings {
            path: PathBuf::from("dealer-price.json"),
            price_field: "price_field".into(),
            benefit_field: benefit.then(|| "benefit_field".to_string()),
            benefit_policy: policy,
        }
    }

    fn listing(model: &str, price: &str, benefit: &str) -> Listing {
        Listing {
            id: format!("bmw-{}", model.to_lowercase()),
            brand: Some("bmw".into()),
            model: model.into(),
            price: price.into(),
            benefit: benefit.into(),
            link: format!("/model/{}/", model.to_lowercase()),
        }
    }

    #[test]
    fn dealer_price_wins_when_lower() {
        let map = OverrideMap::new(
            HashMap::from([("x5".to_string(), json!({"price_field": "4800000"}))]),
            &settings(false, None),
        );
        let mut l = listing("X5", "5000000", "");
        map.reconcile(&mut l);
        assert_eq!(l.price, "4800000");
    }

    #[test]
    fn scraped_price_wins_when_lower() {
        let map = OverrideMap::new(
            HashMap::from([("x5".to_string(), json!({"price_field": 5200000}))]),
            &settings(false, None),
        );
        let mut l = listing("X5", "5000000", "");
        map.reconcile(&mut l);
        assert_eq!(l.price, "5000000");
    }

    #[test]
    fn unparseable_scraped_price_degrades_so_dealer_wins() {
        let map = OverrideMap::new(
            HashMap::from([("x5".to_string(), json!({"price_field": "4800000"}))]),
            &settings(false, None),
        );
        let mut l = listing("X5", "", "");
        map.reconcile(&mut l);
        assert_eq!(l.price, "4800000");
    }

    #[test]
    fn absent_entry_passes_through() {
        let map = OverrideMap::new(HashMap::new(), &settings(false, None));
        let mut l = listing("X5", "5000000", "150000");
        map.reconcile(&mut l);
        assert_eq!(l.price, "5000000");
        assert_eq!(l.benefit, "150000");
    }

    #[test]
    fn benefit_policy_max_and_min() {
        let entries = HashMap::from([(
            "x5".to_string(),
            json!({"price_field": "", "benefit_field": "200000"}),
        )]);
        let map = OverrideMap::new(
            entries.clone(),
            &settings(true, Some(BenefitPolicy::TakeMax)),
        );
        let mut l = listing("X5", "5000000", "150000");
        map.reconcile(&mut l);
        assert_eq!(l.benefit, "200000");

        let map = OverrideMap::new(entries, &settings(true, Some(BenefitPolicy::TakeMin)));
        let mut l = listing("X5", "5000000", "150000");
        map.reconcile(&mut l);
        assert_eq!(l.benefit, "150000");
    }

    #[test]
    fn split_leaves_small_values_alone() {
        assert_eq!(split_glued_price("9999999", 10_000_000), "9999999");
        assert_eq!(split_glued_price("10000000", 10_000_000), "10000000");
        assert_eq!(split_glued_price("", 10_000_000), "");
    }

    #[test]
    fn split_keeps_the_smaller_half() {
        assert_eq!(split_glued_price("12345678", 10_000_000), "1234");
        // odd length: first half gets floor(len/2) digits
        assert_eq!(split_glued_price("123456789", 10_000_000), "1234");
    }

    #[test]
    fn split_digit_counts_are_half_the_input() {
        for digits in ["12345678", "123456789", "4599900045999000"] {
            let out = split_glued_price(digits, 10_000_000);
            let len = digits.len();
            assert!(out.len() == len / 2 || out.len() == len.div_ceil(2));
        }
    }
}
