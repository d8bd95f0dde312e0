//! End-to-end pipeline checks: page body in, reconciled JSON file out.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::json;

use dealerscrape::config::{BenefitPolicy, OverrideSettings, SelectorSet, Strategy};
use dealerscrape::extract::{build_listings, extractor_for};
use dealerscrape::model::Listing;
use dealerscrape::reconcile::{split_glued_price, OverrideMap};
use dealerscrape::store;

const MENU_PAGE: &str = r#"<html><head><script>
window.__STATE__ = {"desktopMenu":{"sections":[{"data":{"tabs":{"items":[{"content":{"cards":[
  {"title":{"text":{"value":"X5"}},"price":{"value":"от 5 000 000 ₽ выгода до 150 000 ₽"},"link":{"url":"/model/x5/"}},
  {"title":{"text":{"value":"BMW X3"}},"price":{"value":"4 200 000 ₽"},"link":{"url":"/model/x3/"}}
]}}]}}}]}};
</script></head></html>"#;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dealerscrape-it-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn embedded_json_page_to_reconciled_file() {
    let strategy = Strategy::EmbeddedJson {
        pattern: r"(?s)window\.__STATE__ = (\{.*?\});".into(),
        cards_path: dealerscrape::config::DEFAULT_CARDS_PATH.into(),
    };
    let extractor = extractor_for(&strategy).unwrap();
    let cards = extractor.extract(MENU_PAGE, "https://bmw.example").unwrap();
    let mut listings = build_listings(cards, "bmw");

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].id, "bmw-x3");
    assert_eq!(listings[0].model, "X3");
    assert_eq!(listings[1].id, "bmw-x5");
    assert_eq!(listings[1].price, "5000000");
    assert_eq!(listings[1].benefit, "150000");

    // dealer file says the X5 is cheaper and the benefit bigger
    let settings = OverrideSettings {
        path: PathBuf::from("unused"),
        price_field: "price".into(),
        benefit_field: Some("benefit".into()),
        benefit_policy: Some(BenefitPolicy::TakeMax),
    };
    let overrides = OverrideMap::new(
        HashMap::from([(
            "x5".to_string(),
            json!({"price": "4800000", "benefit": 200000}),
        )]),
        &settings,
    );
    for listing in &mut listings {
        listing.price = split_glued_price(&listing.price, 10_000_000);
        overrides.reconcile(listing);
    }
    assert_eq!(listings[1].price, "4800000");
    assert_eq!(listings[1].benefit, "200000");
    // no override entry for the x3, untouched
    assert_eq!(listings[0].price, "4200000");

    let dir = temp_dir("embedded");
    let out = dir.join("data").join("cars.json");
    store::save_json(&listings, &[&out]).unwrap();
    let back: Vec<Listing> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(back, listings);
    assert!(dir.join("data").join("federal-models_price.json").exists());
}

#[test]
fn css_page_with_glued_price_is_repaired() {
    let page = r#"
        <ul>
          <li class="card"><span class="name">Belgee X50</span>
              <span class="cost">1 999 900 ₽ 2 149 900 ₽</span>
              <a class="more" href="/models/x50/">more</a></li>
        </ul>"#;
    let strategy = Strategy::Css(SelectorSet {
        item: "li.card".into(),
        model: ".name".into(),
        price: ".cost".into(),
        link: Some("a.more".into()),
    });
    let extractor = extractor_for(&strategy).unwrap();
    let cards = extractor.extract(page, "https://belgee.ru").unwrap();
    let mut listings = build_listings(cards, "belgee");

    // both prices got concatenated into one numeral by the text join
    assert_eq!(listings[0].price, "19999002149900");
    listings[0].price = split_glued_price(&listings[0].price, 10_000_000);
    assert_eq!(listings[0].price, "1999900");
    assert_eq!(listings[0].id, "belgee-x50");
    assert_eq!(listings[0].link, "https://belgee.ru/models/x50/");
}
