//! JSON data editor: discovery and persistence of per-site data files,
//! a type-tagged document tree, and the per-file schema-rule registry.

pub mod rules;
pub mod store;
pub mod typed;

pub use rules::SchemaRules;
pub use store::{DataStore, SiteEntry};
pub use typed::{parse_path, PathSeg, TypedValue};
