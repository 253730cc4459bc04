// src/utils.rs
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

const SHARE_PATH: &str = "/cv/";

/// Opaque id for a new list item
pub fn new_item_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Normalize a name for file system usage
pub fn normalize_file_stem(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `cv-ada-lovelace-2026-10-19.json`, or `cv-2026-10-19.json` without a name
pub fn export_file_name(first: &str, last: &str, at: DateTime<Utc>) -> String {
    let stem = normalize_file_stem(&format!("{} {}", first, last));
    let date = at.format("%Y-%m-%d");
    if stem.is_empty() {
        format!("cv-{}.json", date)
    } else {
        format!("cv-{}-{}.json", stem, date)
    }
}

/// Build output file path for a printable document
pub fn print_file_path(base: &Path, name: &str, template: &str, at: DateTime<Utc>) -> PathBuf {
    let stem = normalize_file_stem(name);
    let stem = if stem.is_empty() { "cv".to_string() } else { stem };
    base.join(format!(
        "{}_{}_{}.html",
        stem,
        template,
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// Public address of a shared CV
pub fn share_url(origin: &str, slug: &str) -> String {
    format!("{}{}{}", origin.trim_end_matches('/'), SHARE_PATH, slug)
}
