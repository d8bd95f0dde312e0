//! Card extraction strategies. All three strategies yield the same four
//! logical fields per card (optional id, model, price, link); only the
//! page-to-value mechanics differ.

pub mod css;
pub mod embedded_json;
pub mod xpath;

use tracing::warn;

use crate::config::Strategy;
use crate::model::{ExtractError, Listing, RawCard};
use crate::normalize;

pub trait CardExtractor {
    fn extract(&self, html: &str, page_url: &str) -> Result<Vec<RawCard>, ExtractError>;
}

pub fn extractor_for(strategy: &Strategy) -> Result<Box<dyn CardExtractor>, ExtractError> {
    Ok(match strategy {
        Strategy::EmbeddedJson {
            pattern,
            cards_path,
        } => Box::new(embedded_json::EmbeddedJsonExtractor::new(
            pattern, cards_path,
        )?),
        Strategy::Css(set) => Box::new(css::CssExtractor::new(set)?),
        Strategy::Xpath(set) => Box::new(xpath::XpathExtractor::new(set)?),
    })
}

/// Turn raw cards into listings: derive ids, clean model names, attach the
/// brand. Cards without a usable id are skipped with a warning rather than
/// failing the whole run.
pub fn build_listings(cards: Vec<RawCard>, brand: &str) -> Vec<Listing> {
    let mut listings = Vec::with_capacity(cards.len());
    for card in cards {
        let id = match card.id {
            Some(id) => id,
            None => match normalize::derive_id(brand, &card.link) {
                Ok(id) => id,
                Err(err) => {
                    warn!(link = %card.link, "skipping card without id: {err}");
                    continue;
                }
            },
        };
        listings.push(Listing {
            id,
            brand: Some(brand.to_string()),
            model: normalize::strip_brand_prefix(&card.model, brand),
            price: card.price,
            benefit: card.benefit,
            link: card.link,
        });
    }
    listings.sort_by(|a, b| a.id.cmp(&b.id));
    listings
}
