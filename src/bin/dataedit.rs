//! CLI for hand-editing the per-site JSON data files. Edits are applied
//! as strings and cast back to each field's original JSON type; every
//! save runs the per-file schema rules and keeps a timestamped backup.
//!
//! Usage:
//!   dataedit list [SITE...]
//!   dataedit show SITE FILE
//!   dataedit set SITE FILE PATH=VALUE...

use std::process::ExitCode;

use tracing::error;

use dealerscrape::config::EditorConfig;
use dealerscrape::editor::{parse_path, DataStore, SchemaRules};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = EditorConfig::from_env().map_err(|err| format!("config error: {err}"))?;
    let store = DataStore::new(&config);
    let rules = SchemaRules::builtin();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("list");
    let rest = args.get(1..).unwrap_or_default();
    match command {
        "list" => cmd_list(&store, rest),
        "show" => {
            let [site, file] = two_args(rest, "show SITE FILE")?;
            cmd_show(&store, site, file)
        }
        "set" => match rest {
            [site, file, edits @ ..] if !edits.is_empty() => {
                cmd_set(&store, &rules, site, file, edits)
            }
            _ => Err("usage: set SITE FILE PATH=VALUE...".into()),
        },
        other => Err(format!(
            "unknown command {other}; expected list, show or set"
        )),
    }
}

fn two_args<'a>(args: &'a [String], usage: &str) -> Result<[&'a str; 2], String> {
    match args {
        [a, b] => Ok([a, b]),
        _ => Err(format!("usage: {usage}")),
    }
}

fn cmd_list(store: &DataStore, filters: &[String]) -> Result<(), String> {
    let sites = store.scan().map_err(|err| format!("scan failed: {err}"))?;
    for entry in sites {
        if !filters.is_empty() && !filters.contains(&entry.site) {
            continue;
        }
        println!("{}", entry.site);
        for file in &entry.files {
            let marker = if store.is_readonly(file) { " (read-only)" } else { "" };
            println!("  {file}{marker}");
        }
    }
    Ok(())
}

fn cmd_show(store: &DataStore, site: &str, file: &str) -> Result<(), String> {
    let doc = store
        .load(site, file)
        .map_err(|err| format!("load failed: {err}"))?;
    let body = serde_json::to_string_pretty(&doc.to_json())
        .map_err(|err| format!("serialize failed: {err}"))?;
    println!("{body}");
    Ok(())
}

fn cmd_set(
    store: &DataStore,
    rules: &SchemaRules,
    site: &str,
    file: &str,
    edits: &[String],
) -> Result<(), String> {
    let original = store
        .load(site, file)
        .map_err(|err| format!("load failed: {err}"))?;
    let mut doc = original.clone();

    for edit in edits {
        let (path, value) = edit
            .split_once('=')
            .ok_or_else(|| format!("expected PATH=VALUE, got {edit}"))?;
        let segs = parse_path(path).map_err(|err| format!("bad path {path}: {err}"))?;
        doc.set_scalar(&segs, value)
            .map_err(|err| format!("cannot set {path}: {err}"))?;
    }

    let doc = rules.apply_typed(file, &original, &doc);
    let backup = store
        .save(site, file, &doc)
        .map_err(|err| format!("save failed: {err}"))?;
    println!("saved {site}/{file}, backup at {}", backup.display());
    Ok(())
}
