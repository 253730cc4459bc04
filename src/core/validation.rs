// src/core/validation.rs
//! Advisory field checks. A failed check is recorded next to the document and
//! never prevents the edit from being applied.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::core::editor::PersonalField;

const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;
const PHOTO_PREFIXES: [&str; 3] = [
    "data:image/png;base64,",
    "data:image/jpeg;base64,",
    "data:image/webp;base64,",
];

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(r"^\+?[0-9][0-9 .\-()]{7,19}$").expect("valid phone pattern")
    })
}

/// Keyed advisory messages, e.g. `"email" -> "Invalid email address"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Re-run the check for `field` against its new value
    pub fn record(&mut self, field: PersonalField, value: &str) {
        let key = field.as_str();
        match check_field(field, value) {
            Some(message) => {
                self.errors.insert(key.to_string(), message);
            }
            None => {
                self.errors.remove(key);
            }
        }
    }
}

/// Returns a message when `value` looks wrong for `field`. Empty values pass.
pub fn check_field(field: PersonalField, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match field {
        PersonalField::Email if !email_regex().is_match(value) => {
            Some("Invalid email address".to_string())
        }
        PersonalField::Phone if !phone_regex().is_match(value) => {
            Some("Invalid phone number".to_string())
        }
        PersonalField::Photo => check_photo(value),
        _ => None,
    }
}

fn check_photo(value: &str) -> Option<String> {
    if !PHOTO_PREFIXES.iter().any(|prefix| value.starts_with(prefix)) {
        return Some("Photo must be a PNG, JPEG or WebP image".to_string());
    }
    // base64 inflates by 4/3
    if value.len() / 4 * 3 > MAX_PHOTO_BYTES {
        return Some("Photo is larger than 2 MB".to_string());
    }
    None
}
