// src/types/envelope.rs
//! Wrappers written to each persistence destination, plus remote API payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

use crate::error::CvError;
use crate::types::cv_data::{CvData, TemplateId};

pub const LOCAL_STORAGE_KEY: &str = "intowork_cv_data";
pub const EXPORT_VERSION: &str = "1.0";

// ===== Local storage =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEnvelope {
    pub cv_data: CvData,
    pub template: TemplateId,
    pub saved_at: DateTime<Utc>,
}

impl LocalEnvelope {
    pub fn new(cv_data: CvData, template: TemplateId) -> Self {
        Self {
            cv_data,
            template,
            saved_at: Utc::now(),
        }
    }

    /// Lenient read of the local blob. Anything unreadable yields `None` so
    /// the caller keeps the empty document.
    pub fn parse_lenient(text: &str) -> Option<(CvData, TemplateId)> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Local CV copy is not valid JSON, starting empty: {}", e);
                return None;
            }
        };

        let cv_value = value.get("cvData")?.clone();
        let mut cv_data: CvData = match serde_json::from_value(cv_value) {
            Ok(cv) => cv,
            Err(e) => {
                warn!("Local CV copy does not match the document shape: {}", e);
                return None;
            }
        };
        cv_data.normalize();

        let template = value
            .get("template")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        Some((cv_data, template))
    }
}

// ===== File export / import =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub cv_data: CvData,
    pub template: TemplateId,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportEnvelope {
    pub fn new(cv_data: CvData, template: TemplateId) -> Self {
        Self {
            cv_data,
            template,
            exported_at: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, CvError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CvError::InvalidImport(format!("cannot serialize export: {}", e)))
    }
}

/// Validated result of reading an export file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedCv {
    pub cv_data: CvData,
    pub template: Option<TemplateId>,
}

impl ImportedCv {
    /// Strict read of user supplied JSON. Either the whole document is
    /// accepted or an error explains why nothing was.
    pub fn parse(text: &str) -> Result<Self, CvError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CvError::InvalidImport(format!("not valid JSON ({})", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| CvError::InvalidImport("top level must be a JSON object".to_string()))?;

        let cv_value = object
            .get("cvData")
            .ok_or_else(|| CvError::InvalidImport("missing 'cvData'".to_string()))?;

        if !cv_value.is_object() {
            return Err(CvError::InvalidImport("'cvData' must be an object".to_string()));
        }

        let mut cv_data: CvData = serde_json::from_value(cv_value.clone())
            .map_err(|e| CvError::InvalidImport(format!("'cvData' has the wrong shape ({})", e)))?;

        check_ids(&cv_data)?;
        cv_data.normalize();

        let template = match object.get("template") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(raw.parse::<TemplateId>()?),
            Some(other) => {
                return Err(CvError::InvalidImport(format!(
                    "'template' must be a string, got {}",
                    other
                )))
            }
        };

        Ok(Self { cv_data, template })
    }
}

fn check_ids(cv: &CvData) -> Result<(), CvError> {
    fn unique<'a>(list: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), CvError> {
        let mut seen = HashSet::new();
        for id in ids {
            if id.trim().is_empty() {
                return Err(CvError::InvalidImport(format!("{} item without an id", list)));
            }
            if !seen.insert(id) {
                return Err(CvError::InvalidImport(format!("duplicate id '{}' in {}", id, list)));
            }
        }
        Ok(())
    }

    unique("experiences", cv.experiences.iter().map(|i| i.id.as_str()))?;
    unique("educations", cv.educations.iter().map(|i| i.id.as_str()))?;
    unique("skills", cv.skills.iter().map(|i| i.id.as_str()))?;
    unique("languages", cv.languages.iter().map(|i| i.id.as_str()))?;
    Ok(())
}

// ===== Remote API payloads =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCv {
    pub cv_data: CvData,
    /// Kept raw so an unknown template from the server does not fail the fetch
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCvUpdate<'a> {
    pub cv_data: &'a CvData,
    pub template: TemplateId,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub is_public: bool,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvAnalytics {
    #[serde(alias = "view_count", default)]
    pub views: u64,
    #[serde(alias = "download_count", default)]
    pub downloads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cv_data::SkillItem;

    fn sample() -> CvData {
        let mut cv = CvData::default();
        cv.personal_info.first_name = "Ada".to_string();
        cv.skills.push(SkillItem {
            id: "s1".to_string(),
            name: "Rust".to_string(),
            level: 4,
        });
        cv
    }

    #[test]
    fn test_export_import_round_trip() {
        let export = ExportEnvelope::new(sample(), TemplateId::Minimal);
        let text = export.to_json().unwrap();

        let imported = ImportedCv::parse(&text).unwrap();
        assert_eq!(imported.cv_data, sample());
        assert_eq!(imported.template, Some(TemplateId::Minimal));
        assert!(text.contains("\"exportedAt\""));
        assert!(text.contains("\"version\": \"1.0\""));
    }

    #[test]
    fn test_import_without_template() {
        let imported = ImportedCv::parse(r#"{"cvData": {"personalInfo": {"firstName": "Ada"}}}"#)
            .unwrap();
        assert_eq!(imported.cv_data.personal_info.first_name, "Ada");
        assert_eq!(imported.template, None);
    }

    #[test]
    fn test_import_rejections() {
        assert!(ImportedCv::parse("not json").is_err());
        assert!(ImportedCv::parse("[1, 2]").is_err());
        assert!(ImportedCv::parse(r#"{"template": "bold"}"#).is_err());
        assert!(ImportedCv::parse(r#"{"cvData": "oops"}"#).is_err());
        assert!(ImportedCv::parse(r#"{"cvData": {"skills": [{"id": "a", "level": "high"}]}}"#).is_err());
        assert!(ImportedCv::parse(r#"{"cvData": {}, "template": "neon"}"#).is_err());
        assert!(ImportedCv::parse(
            r#"{"cvData": {"skills": [{"id": "a", "name": "x"}, {"id": "a", "name": "y"}]}}"#
        )
        .is_err());
        assert!(ImportedCv::parse(r#"{"cvData": {"languages": [{"name": "Deutsch"}]}}"#).is_err());
    }

    #[test]
    fn test_import_clamps_skill_levels() {
        let imported =
            ImportedCv::parse(r#"{"cvData": {"skills": [{"id": "a", "name": "Go", "level": 9}]}}"#)
                .unwrap();
        assert_eq!(imported.cv_data.skills[0].level, 5);
    }

    #[test]
    fn test_local_round_trip() {
        let envelope = LocalEnvelope::new(sample(), TemplateId::Bold);
        let text = serde_json::to_string(&envelope).unwrap();
        assert!(text.contains("\"savedAt\""));

        let (cv, template) = LocalEnvelope::parse_lenient(&text).unwrap();
        assert_eq!(cv, sample());
        assert_eq!(template, TemplateId::Bold);
    }

    #[test]
    fn test_local_lenient_fallbacks() {
        assert!(LocalEnvelope::parse_lenient("{{{").is_none());
        assert!(LocalEnvelope::parse_lenient(r#"{"other": 1}"#).is_none());
        assert!(LocalEnvelope::parse_lenient(r#"{"cvData": {"skills": 3}}"#).is_none());

        let (_, template) =
            LocalEnvelope::parse_lenient(r#"{"cvData": {}, "template": "neon"}"#).unwrap();
        assert_eq!(template, TemplateId::Elegance);
    }

    #[test]
    fn test_analytics_aliases() {
        let a: CvAnalytics = serde_json::from_str(r#"{"view_count": 7, "download_count": 2}"#).unwrap();
        assert_eq!(a, CvAnalytics { views: 7, downloads: 2 });
    }

    #[test]
    fn test_remote_cv_payload() {
        let remote: RemoteCv = serde_json::from_str(
            r#"{"cv_data": {"personalInfo": {"lastName": "Lovelace"}}, "template": "bold", "is_public": true, "slug": "ada-x1"}"#,
        )
        .unwrap();
        assert_eq!(remote.cv_data.personal_info.last_name, "Lovelace");
        assert_eq!(remote.slug.as_deref(), Some("ada-x1"));

        let cv = sample();
        let update = RemoteCvUpdate {
            cv_data: &cv,
            template: TemplateId::Executive,
            is_public: false,
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["template"], "executive");
        assert_eq!(body["cv_data"]["personalInfo"]["firstName"], "Ada");
    }
}
