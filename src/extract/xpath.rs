//! XPath strategy. The full XPath language is not needed here: every
//! expression used by the site configs is a plain location path, so a
//! supported subset is translated to a CSS selector and evaluated with
//! `scraper`. Trailing `/text()` and `/@attr` steps select what to read
//! from the matched node.
//!
//! Supported: `//`, `/`, `*`, `tag`, `[@attr]`, `[@attr='v']`, `[n]`,
//! a leading `./`, and a final `text()` or `@attr` step.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::CardExtractor;
use crate::config::XpathSet;
use crate::model::{ExtractError, RawCard};
use crate::normalize;

static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*|\*)((?:\[[^\]]+\])*)$").expect("valid step regex")
});

static PREDICATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid predicate regex"));

/// What to read from the node matched by the element part of the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMode {
    Text,
    Attr(String),
}

/// A compiled relative expression: optional descendant selector plus the
/// value to read. `selector: None` means "read from the item itself".
pub struct CompiledXpath {
    selector: Option<Selector>,
    mode: ValueMode,
}

impl CompiledXpath {
    pub fn compile(xpath: &str) -> Result<Self, ExtractError> {
        let (css, mode) = translate(xpath)?;
        let selector = if css.is_empty() {
            None
        } else {
            Some(
                Selector::parse(&css)
                    .map_err(|e| ExtractError::BadSelector(format!("{xpath} -> {css}: {e}")))?,
            )
        };
        Ok(Self { selector, mode })
    }

    fn read(&self, item: ElementRef) -> Option<String> {
        let node = match &self.selector {
            Some(sel) => item.select(sel).next()?,
            None => item,
        };
        let value = match &self.mode {
            ValueMode::Text => node.text().collect::<String>(),
            ValueMode::Attr(name) => node.value().attr(name)?.to_string(),
        };
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Translate the supported XPath subset into a CSS selector string plus a
/// value mode. Unsupported constructs (functions, axes, unions) are
/// rejected at configuration time.
pub fn translate(xpath: &str) -> Result<(String, ValueMode), ExtractError> {
    let mut rest = xpath.trim();
    if let Some(stripped) = rest.strip_prefix('.') {
        rest = stripped;
    }
    let mut css = String::new();
    let mut mode = ValueMode::Text;
    let mut descendant = true;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("//") {
            descendant = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            descendant = false;
            rest = stripped;
        } else if !css.is_empty() {
            return Err(ExtractError::BadSelector(format!(
                "unsupported xpath: {xpath}"
            )));
        }

        let end = rest.find('/').unwrap_or(rest.len());
        let step = &rest[..end];
        rest = &rest[end..];

        if step == "text()" {
            if !rest.is_empty() {
                return Err(ExtractError::BadSelector(format!(
                    "text() must be the final step: {xpath}"
                )));
            }
            mode = ValueMode::Text;
            break;
        }
        if let Some(attr) = step.strip_prefix('@') {
            if !rest.is_empty() || !is_name(attr) {
                return Err(ExtractError::BadSelector(format!(
                    "unsupported attribute step in: {xpath}"
                )));
            }
            mode = ValueMode::Attr(attr.to_string());
            break;
        }

        let translated = translate_step(step)
            .ok_or_else(|| ExtractError::BadSelector(format!("unsupported step {step} in {xpath}")))?;
        if !css.is_empty() {
            css.push_str(if descendant { " " } else { " > " });
        }
        css.push_str(&translated);
    }

    Ok((css, mode))
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn translate_step(step: &str) -> Option<String> {
    let caps = STEP_RE.captures(step)?;
    let mut out = match &caps[1] {
        "*" => String::from("*"),
        tag => tag.to_string(),
    };
    for pred in PREDICATE_RE.captures_iter(&caps[2]) {
        let body = pred[1].trim();
        if let Ok(n) = body.parse::<usize>() {
            out.push_str(&format!(":nth-of-type({n})"));
            continue;
        }
        let attr = body.strip_prefix('@')?;
        match attr.split_once('=') {
            None if is_name(attr) => out.push_str(&format!("[{attr}]")),
            Some((name, value)) if is_name(name) => {
                let value = value.trim().trim_matches(['\'', '"']);
                out.push_str(&format!("[{name}=\"{value}\"]"));
            }
            _ => return None,
        }
    }
    Some(out)
}

pub struct XpathExtractor {
    item: Selector,
    model: CompiledXpath,
    price: CompiledXpath,
    link: CompiledXpath,
    id: Option<CompiledXpath>,
}

impl XpathExtractor {
    pub fn new(set: &XpathSet) -> Result<Self, ExtractError> {
        let (item_css, item_mode) = translate(&set.item)?;
        if item_mode != ValueMode::Text || item_css.is_empty() {
            return Err(ExtractError::BadSelector(format!(
                "item xpath must select elements: {}",
                set.item
            )));
        }
        let item = Selector::parse(&item_css)
            .map_err(|e| ExtractError::BadSelector(format!("{}: {e}", set.item)))?;
        Ok(Self {
            item,
            model: CompiledXpath::compile(&set.model)?,
            price: CompiledXpath::compile(&set.price)?,
            link: CompiledXpath::compile(&set.link)?,
            id: set.id.as_deref().map(CompiledXpath::compile).transpose()?,
        })
    }
}

impl CardExtractor for XpathExtractor {
    fn extract(&self, html: &str, page_url: &str) -> Result<Vec<RawCard>, ExtractError> {
        let document = Html::parse_document(html);
        let items: Vec<ElementRef> = document.select(&self.item).collect();
        if items.is_empty() {
            return Err(ExtractError::NoItems);
        }

        let mut cards = Vec::with_capacity(items.len());
        for item in items {
            let Some(model) = self.model.read(item) else {
                warn!("item without model value, skipped");
                continue;
            };
            let Some(link) = self.link.read(item) else {
                warn!(%model, "item without link value, skipped");
                continue;
            };
            let price = self
                .price
                .read(item)
                .map(|t| normalize::digits_only(&t))
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "0".into());
            cards.push(RawCard {
                id: self.id.as_ref().and_then(|x| x.read(item)),
                model,
                price,
                benefit: String::new(),
                link: super::css::resolve_link(&link, page_url),
            });
        }
        Ok(cards)
    }
}
