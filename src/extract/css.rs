//! CSS-selector strategy over the fetched HTML.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use super::CardExtractor;
use crate::model::{ExtractError, RawCard};
use crate::normalize;

pub struct CssExtractor {
    item: Selector,
    model: Selector,
    price: Selector,
    link: Option<Selector>,
}

fn parse_selector(raw: &str) -> Result<Selector, ExtractError> {
    Selector::parse(raw).map_err(|e| ExtractError::BadSelector(format!("{raw}: {e}")))
}

impl CssExtractor {
    pub fn new(set: &crate::config::SelectorSet) -> Result<Self, ExtractError> {
        Ok(Self {
            item: parse_selector(&set.item)?,
            model: parse_selector(&set.model)?,
            price: parse_selector(&set.price)?,
            link: set.link.as_deref().map(parse_selector).transpose()?,
        })
    }
}

impl CardExtractor for CssExtractor {
    fn extract(&self, html: &str, page_url: &str) -> Result<Vec<RawCard>, ExtractError> {
        let document = Html::parse_document(html);
        let items: Vec<ElementRef> = document.select(&self.item).collect();
        if items.is_empty() {
            return Err(ExtractError::NoItems);
        }

        let mut cards = Vec::with_capacity(items.len());
        for item in items {
            let Some(model) = element_text(item, &self.model) else {
                warn!("item without model text, skipped");
                continue;
            };
            let price = element_text(item, &self.price)
                .map(|t| normalize::digits_only(&t))
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "0".into());
            let Some(link) = self.find_link(item, page_url) else {
                warn!(%model, "item without link, skipped");
                continue;
            };
            cards.push(RawCard {
                id: None,
                model,
                price,
                benefit: String::new(),
                link,
            });
        }
        Ok(cards)
    }
}

impl CssExtractor {
    /// The item itself may be the anchor; otherwise look for a descendant
    /// matching the link selector. Query strings are dropped and relative
    /// links resolved against the page URL.
    fn find_link(&self, item: ElementRef, page_url: &str) -> Option<String> {
        let href = item
            .value()
            .attr("href")
            .map(str::to_string)
            .or_else(|| {
                let sel = self.link.as_ref()?;
                item.select(sel).next()?.value().attr("href").map(str::to_string)
            })?;
        Some(resolve_link(&href, page_url))
    }
}

pub(super) fn resolve_link(href: &str, page_url: &str) -> String {
    let href = href.split('?').next().unwrap_or(href);
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

pub(super) fn element_text(item: ElementRef, selector: &Selector) -> Option<String> {
    let node = item.select(selector).next()?;
    let text = node.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorSet;

    const PAGE: &str = r#"
        <div class="menu-models">
          <div class="menu-models__item">
            <span class="menu-models__item-title">Belgee X50</span>
            <span class="menu-models__item-price">от 1 999 900 ₽</span>
            <a class="menu-models__item-btn" href="/models/x50/?utm=menu">Подробнее</a>
          </div>
          <div class="menu-models__item">
            <span class="menu-models__item-title">Belgee X70</span>
            <span class="menu-models__item-price"></span>
            <a class="menu-models__item-btn" href="https://belgee.ru/models/x70/">Подробнее</a>
          </div>
        </div>"#;

    fn extractor() -> CssExtractor {
        CssExtractor::new(&SelectorSet {
            item: ".menu-models__item".into(),
            model: ".menu-models__item-title".into(),
            price: ".menu-models__item-price".into(),
            link: Some(".menu-models__item-btn".into()),
        })
        .unwrap()
    }

    #[test]
    fn extracts_cards_with_resolved_links() {
        let cards = extractor().extract(PAGE, "https://belgee.ru").unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].model, "Belgee X50");
        assert_eq!(cards[0].price, "1999900");
        assert_eq!(cards[0].link, "https://belgee.ru/models/x50/");
        // empty price text degrades to "0", absolute links pass through
        assert_eq!(cards[1].price, "0");
        assert_eq!(cards[1].link, "https://belgee.ru/models/x70/");
    }

    #[test]
    fn no_items_is_an_error() {
        let err = extractor()
            .extract("<div>nothing here</div>", "https://belgee.ru")
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoItems));
    }

    #[test]
    fn query_string_is_dropped() {
        assert_eq!(
            resolve_link("/m/x50/?a=1", "https://belgee.ru"),
            "https://belgee.ru/m/x50/"
        );
    }
}
