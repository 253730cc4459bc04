// src/types/cv_data.rs
//! CV document model shared by the editor, the persistence envelopes and the renderer

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CvError;
use crate::utils::new_item_id;

pub const SKILL_LEVEL_MIN: u8 = 1;
pub const SKILL_LEVEL_MAX: u8 = 5;

// ===== Root document =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvData {
    pub personal_info: PersonalInfo,
    pub experiences: Vec<ExperienceItem>,
    pub educations: Vec<EducationItem>,
    pub skills: Vec<SkillItem>,
    pub languages: Vec<LanguageItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    /// Data URI of the profile picture
    pub photo: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceItem {
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
}

impl ExperienceItem {
    /// End date to show, `None` while the position is current
    pub fn display_end_date(&self) -> Option<&str> {
        if self.current {
            None
        } else {
            Some(self.end_date.as_str())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationItem {
    pub id: String,
    pub school: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillItem {
    pub id: String,
    pub name: String,
    pub level: u8,
}

impl Default for SkillItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            level: 3,
        }
    }
}

pub fn clamp_skill_level(level: u8) -> u8 {
    level.clamp(SKILL_LEVEL_MIN, SKILL_LEVEL_MAX)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageItem {
    pub id: String,
    pub name: String,
    pub level: LanguageLevel,
}

// ===== Language proficiency =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageLevel {
    A1,
    A2,
    #[default]
    B1,
    B2,
    C1,
    C2,
    Natif,
}

impl LanguageLevel {
    pub const ALL: [LanguageLevel; 7] = [
        Self::A1,
        Self::A2,
        Self::B1,
        Self::B2,
        Self::C1,
        Self::C2,
        Self::Natif,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::Natif => "Natif",
        }
    }

    /// Human label used by the printed templates
    pub fn label(&self) -> &'static str {
        match self {
            Self::A1 => "Débutant (A1)",
            Self::A2 => "Élémentaire (A2)",
            Self::B1 => "Intermédiaire (B1)",
            Self::B2 => "Avancé (B2)",
            Self::C1 => "Autonome (C1)",
            Self::C2 => "Maîtrise (C2)",
            Self::Natif => "Langue maternelle",
        }
    }
}

impl fmt::Display for LanguageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageLevel {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CvError::InvalidValue {
                field: "level".to_string(),
                reason: format!(
                    "'{}' is not one of A1, A2, B1, B2, C1, C2, Natif",
                    trimmed
                ),
            })
    }
}

// ===== Templates =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateId {
    #[default]
    Elegance,
    Bold,
    Minimal,
    Creative,
    Executive,
}

impl TemplateId {
    pub const ALL: [TemplateId; 5] = [
        Self::Elegance,
        Self::Bold,
        Self::Minimal,
        Self::Creative,
        Self::Executive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elegance => "elegance",
            Self::Bold => "bold",
            Self::Minimal => "minimal",
            Self::Creative => "creative",
            Self::Executive => "executive",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Elegance => "Élégance",
            Self::Bold => "Bold",
            Self::Minimal => "Minimal",
            Self::Creative => "Créatif",
            Self::Executive => "Executive",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Elegance => "Classic serif layout with a navy accent",
            Self::Bold => "High-contrast header band with strong section titles",
            Self::Minimal => "Monochrome single column with generous whitespace",
            Self::Creative => "Coloured sidebar with photo, skills and languages",
            Self::Executive => "Two-column layout with a dark sidebar for senior profiles",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|template| template.as_str() == lowered)
            .ok_or_else(|| CvError::UnknownTemplate(s.to_string()))
    }
}

// ===== Document-level helpers =====

impl CvData {
    /// Rough completion percentage used for progress display
    pub fn completion(&self) -> u8 {
        let info = &self.personal_info;
        let checks = [
            !info.first_name.trim().is_empty(),
            !info.last_name.trim().is_empty(),
            !info.email.trim().is_empty(),
            !info.phone.trim().is_empty(),
            !info.address.trim().is_empty(),
            !info.title.trim().is_empty(),
            !info.summary.trim().is_empty(),
            info.photo.is_some(),
            !self.experiences.is_empty(),
            !self.educations.is_empty(),
            !self.skills.is_empty(),
            !self.languages.is_empty(),
        ];

        let filled = checks.iter().filter(|done| **done).count();
        ((filled * 100) / checks.len()) as u8
    }

    /// Full name as displayed in headers, empty when neither part is set
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.personal_info.first_name.trim(),
            self.personal_info.last_name.trim()
        )
        .trim()
        .to_string()
    }

    pub fn has_name(&self) -> bool {
        !self.full_name().is_empty()
    }

    /// Bring out-of-range values back inside the model's bounds
    pub fn normalize(&mut self) {
        for skill in &mut self.skills {
            skill.level = clamp_skill_level(skill.level);
        }
    }

    /// Give a fresh id to every item whose id is blank or already taken in
    /// its list. Returns the number of items renamed.
    pub fn repair_ids(&mut self) -> usize {
        fn repair<'a>(ids: impl Iterator<Item = &'a mut String>) -> usize {
            let mut seen = HashSet::new();
            let mut repaired = 0;
            for id in ids {
                if id.trim().is_empty() || seen.contains(id.as_str()) {
                    *id = new_item_id();
                    repaired += 1;
                }
                seen.insert(id.clone());
            }
            repaired
        }

        repair(self.experiences.iter_mut().map(|i| &mut i.id))
            + repair(self.educations.iter_mut().map(|i| &mut i.id))
            + repair(self.skills.iter_mut().map(|i| &mut i.id))
            + repair(self.languages.iter_mut().map(|i| &mut i.id))
    }
}
