//! Dealer site listing scraper and JSON data tooling.
//!
//! The scrape pipeline is fetch -> extract -> normalize -> reconcile ->
//! write; each stage lives in its own module and is wired together by the
//! `dealerscrape` binary. The `editor` module backs the `dataedit` binary.

pub mod config;
pub mod dealer;
pub mod editor;
pub mod errlog;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod store;
