// src/core/editor.rs
//! In-memory CV document and the closed set of edits that can be applied to it.
//!
//! Every operation is synchronous and total: an unknown id is a no-op and an
//! invalid template is rejected without touching the document. `apply` reports
//! what the persistence layer should do next through [`Effect`].

use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::core::validation::ValidationErrors;
use crate::error::CvError;
use crate::types::cv_data::{
    clamp_skill_level, CvData, EducationItem, ExperienceItem, LanguageItem, LanguageLevel,
    SkillItem, TemplateId, SKILL_LEVEL_MAX, SKILL_LEVEL_MIN,
};
use crate::utils::new_item_id;

// ===== Field names =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    Photo,
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    Title,
    Summary,
}

impl PersonalField {
    pub const ALL: [PersonalField; 8] = [
        Self::Photo,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Address,
        Self::Title,
        Self::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Title => "title",
            Self::Summary => "summary",
        }
    }
}

impl FromStr for PersonalField {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_field_name(s);
        Self::ALL
            .into_iter()
            .find(|field| normalize_field_name(field.as_str()) == wanted)
            .ok_or_else(|| CvError::UnknownField {
                section: "personalInfo".to_string(),
                field: s.to_string(),
            })
    }
}

/// `first_name`, `first-name` and `firstName` all name the same field
fn normalize_field_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListName {
    Experiences,
    Educations,
    Skills,
    Languages,
}

impl ListName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experiences => "experiences",
            Self::Educations => "educations",
            Self::Skills => "skills",
            Self::Languages => "languages",
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListName {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "experiences" | "experience" => Ok(Self::Experiences),
            "educations" | "education" => Ok(Self::Educations),
            "skills" | "skill" => Ok(Self::Skills),
            "languages" | "language" => Ok(Self::Languages),
            _ => Err(CvError::UnknownField {
                section: "document".to_string(),
                field: s.to_string(),
            }),
        }
    }
}

// ===== Item edits =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperienceEdit {
    Company(String),
    Position(String),
    StartDate(String),
    EndDate(String),
    Current(bool),
    Description(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EducationEdit {
    School(String),
    Degree(String),
    Field(String),
    StartDate(String),
    EndDate(String),
    Description(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillEdit {
    Name(String),
    /// Clamped to 1..=5 when applied
    Level(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageEdit {
    Name(String),
    Level(LanguageLevel),
}

/// One field replacement on an array item. The variant names the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEdit {
    Experience(ExperienceEdit),
    Education(EducationEdit),
    Skill(SkillEdit),
    Language(LanguageEdit),
}

impl ItemEdit {
    pub fn list(&self) -> ListName {
        match self {
            Self::Experience(_) => ListName::Experiences,
            Self::Education(_) => ListName::Educations,
            Self::Skill(_) => ListName::Skills,
            Self::Language(_) => ListName::Languages,
        }
    }

    /// Build an edit from loosely typed input such as CLI arguments
    pub fn parse(list: ListName, field: &str, value: &str) -> Result<Self, CvError> {
        let key = normalize_field_name(field);
        let text = value.to_string();
        let unknown = || CvError::UnknownField {
            section: list.to_string(),
            field: field.to_string(),
        };

        let edit = match list {
            ListName::Experiences => Self::Experience(match key.as_str() {
                "company" => ExperienceEdit::Company(text),
                "position" => ExperienceEdit::Position(text),
                "startdate" => ExperienceEdit::StartDate(text),
                "enddate" => ExperienceEdit::EndDate(text),
                "current" => ExperienceEdit::Current(parse_flag(value)?),
                "description" => ExperienceEdit::Description(text),
                _ => return Err(unknown()),
            }),
            ListName::Educations => Self::Education(match key.as_str() {
                "school" => EducationEdit::School(text),
                "degree" => EducationEdit::Degree(text),
                "field" => EducationEdit::Field(text),
                "startdate" => EducationEdit::StartDate(text),
                "enddate" => EducationEdit::EndDate(text),
                "description" => EducationEdit::Description(text),
                _ => return Err(unknown()),
            }),
            ListName::Skills => Self::Skill(match key.as_str() {
                "name" => SkillEdit::Name(text),
                "level" => SkillEdit::Level(parse_skill_level(value)?),
                _ => return Err(unknown()),
            }),
            ListName::Languages => Self::Language(match key.as_str() {
                "name" => LanguageEdit::Name(text),
                "level" => LanguageEdit::Level(value.parse()?),
                _ => return Err(unknown()),
            }),
        };

        Ok(edit)
    }
}

/// Any whole number is accepted and clamped into 1..=5
fn parse_skill_level(value: &str) -> Result<u8, CvError> {
    let level: i64 = value.trim().parse().map_err(|_| CvError::InvalidValue {
        field: "level".to_string(),
        reason: format!("'{}' is not a whole number", value),
    })?;
    let clamped = level.clamp(i64::from(SKILL_LEVEL_MIN), i64::from(SKILL_LEVEL_MAX));
    Ok(u8::try_from(clamped).unwrap_or(SKILL_LEVEL_MIN))
}

fn parse_flag(value: &str) -> Result<bool, CvError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(CvError::InvalidValue {
            field: "current".to_string(),
            reason: format!("'{}' is not a boolean", value),
        }),
    }
}

// ===== Operations =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    UpdateField { field: PersonalField, value: String },
    AddItem(ListName),
    UpdateItem { id: String, edit: ItemEdit },
    RemoveItem { list: ListName, id: String },
    SetTemplate(String),
    Reset,
}

/// What the persistence layer has to do after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// State may have changed, schedule a save
    Schedule,
    /// Item appended with this id, schedule a save
    Added(String),
    /// Whole document reset, erase the local copy
    Cleared,
    /// Operation refused, nothing changed
    Rejected(String),
}

// ===== Editor =====

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CvEditor {
    data: CvData,
    template: TemplateId,
    errors: ValidationErrors,
}

impl CvEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(data: CvData, template: TemplateId) -> Self {
        Self {
            data,
            template,
            errors: ValidationErrors::default(),
        }
    }

    pub fn data(&self) -> &CvData {
        &self.data
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Swap in a whole document, e.g. after hydrate or import
    pub fn replace(&mut self, mut data: CvData, template: Option<TemplateId>) {
        data.normalize();
        self.data = data;
        if let Some(template) = template {
            self.template = template;
        }
        self.errors.clear();
        let info = self.data.personal_info.clone();
        self.errors.record(PersonalField::Email, &info.email);
        self.errors.record(PersonalField::Phone, &info.phone);
        if let Some(photo) = &info.photo {
            self.errors.record(PersonalField::Photo, photo);
        }
    }

    pub fn apply(&mut self, op: Operation) -> Effect {
        match op {
            Operation::UpdateField { field, value } => {
                self.update_field(field, value);
                Effect::Schedule
            }
            Operation::AddItem(list) => Effect::Added(self.add_item(list)),
            Operation::UpdateItem { id, edit } => {
                if !self.update_item(&id, edit) {
                    debug!("update_item: no item with id {}", id);
                }
                Effect::Schedule
            }
            Operation::RemoveItem { list, id } => {
                if !self.remove_item(list, &id) {
                    debug!("remove_item: no item with id {} in {}", id, list);
                }
                Effect::Schedule
            }
            Operation::SetTemplate(raw) => match raw.parse::<TemplateId>() {
                Ok(template) => {
                    self.template = template;
                    Effect::Schedule
                }
                Err(e) => Effect::Rejected(e.to_string()),
            },
            Operation::Reset => {
                *self = Self::default();
                Effect::Cleared
            }
        }
    }

    fn update_field(&mut self, field: PersonalField, value: String) {
        self.errors.record(field, &value);

        let info = &mut self.data.personal_info;
        match field {
            PersonalField::Photo => {
                info.photo = if value.trim().is_empty() {
                    None
                } else {
                    Some(value)
                }
            }
            PersonalField::FirstName => info.first_name = value,
            PersonalField::LastName => info.last_name = value,
            PersonalField::Email => info.email = value,
            PersonalField::Phone => info.phone = value,
            PersonalField::Address => info.address = value,
            PersonalField::Title => info.title = value,
            PersonalField::Summary => info.summary = value,
        }
    }

    fn add_item(&mut self, list: ListName) -> String {
        let id = new_item_id();
        match list {
            ListName::Experiences => self.data.experiences.push(ExperienceItem {
                id: id.clone(),
                ..Default::default()
            }),
            ListName::Educations => self.data.educations.push(EducationItem {
                id: id.clone(),
                ..Default::default()
            }),
            ListName::Skills => self.data.skills.push(SkillItem {
                id: id.clone(),
                ..Default::default()
            }),
            ListName::Languages => self.data.languages.push(LanguageItem {
                id: id.clone(),
                ..Default::default()
            }),
        }
        id
    }

    /// Returns false when no item carries `id`
    fn update_item(&mut self, id: &str, edit: ItemEdit) -> bool {
        match edit {
            ItemEdit::Experience(edit) => {
                let Some(item) = self.data.experiences.iter_mut().find(|i| i.id == id) else {
                    return false;
                };
                match edit {
                    ExperienceEdit::Company(v) => item.company = v,
                    ExperienceEdit::Position(v) => item.position = v,
                    ExperienceEdit::StartDate(v) => item.start_date = v,
                    ExperienceEdit::EndDate(v) => item.end_date = v,
                    ExperienceEdit::Current(v) => item.current = v,
                    ExperienceEdit::Description(v) => item.description = v,
                }
            }
            ItemEdit::Education(edit) => {
                let Some(item) = self.data.educations.iter_mut().find(|i| i.id == id) else {
                    return false;
                };
                match edit {
                    EducationEdit::School(v) => item.school = v,
                    EducationEdit::Degree(v) => item.degree = v,
                    EducationEdit::Field(v) => item.field = v,
                    EducationEdit::StartDate(v) => item.start_date = v,
                    EducationEdit::EndDate(v) => item.end_date = v,
                    EducationEdit::Description(v) => item.description = v,
                }
            }
            ItemEdit::Skill(edit) => {
                let Some(item) = self.data.skills.iter_mut().find(|i| i.id == id) else {
                    return false;
                };
                match edit {
                    SkillEdit::Name(v) => item.name = v,
                    SkillEdit::Level(v) => item.level = clamp_skill_level(v),
                }
            }
            ItemEdit::Language(edit) => {
                let Some(item) = self.data.languages.iter_mut().find(|i| i.id == id) else {
                    return false;
                };
                match edit {
                    LanguageEdit::Name(v) => item.name = v,
                    LanguageEdit::Level(v) => item.level = v,
                }
            }
        }
        true
    }

    fn remove_item(&mut self, list: ListName, id: &str) -> bool {
        fn retain_without<T>(items: &mut Vec<T>, id: &str, item_id: impl Fn(&T) -> &str) -> bool {
            let before = items.len();
            items.retain(|item| item_id(item) != id);
            items.len() != before
        }

        match list {
            ListName::Experiences => retain_without(&mut self.data.experiences, id, |i| i.id.as_str()),
            ListName::Educations => retain_without(&mut self.data.educations, id, |i| i.id.as_str()),
            ListName::Skills => retain_without(&mut self.data.skills, id, |i| i.id.as_str()),
            ListName::Languages => retain_without(&mut self.data.languages, id, |i| i.id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn add(editor: &mut CvEditor, list: ListName) -> String {
        match editor.apply(Operation::AddItem(list)) {
            Effect::Added(id) => id,
            other => panic!("expected Added, got {:?}", other),
        }
    }

    fn skill_ids(editor: &CvEditor) -> Vec<String> {
        editor.data().skills.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_add_then_update_company() {
        let mut editor = CvEditor::new();
        let id = add(&mut editor, ListName::Experiences);

        editor.apply(Operation::UpdateItem {
            id: id.clone(),
            edit: ItemEdit::Experience(ExperienceEdit::Company("Acme".to_string())),
        });

        let experiences = &editor.data().experiences;
        assert_eq!(experiences.len(), 1);
        assert_eq!(
            experiences[0],
            ExperienceItem {
                id,
                company: "Acme".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_add_remove_sequence_keeps_order_and_ids() {
        let mut editor = CvEditor::new();
        let mut expected: Vec<String> = Vec::new();
        let mut removed: HashSet<String> = HashSet::new();

        // interleave additions and removals with a fixed pattern
        for round in 0..30 {
            let id = add(&mut editor, ListName::Skills);
            expected.push(id);

            if round % 3 == 2 {
                let victim = expected.remove(round % expected.len());
                removed.insert(victim.clone());
                editor.apply(Operation::RemoveItem {
                    list: ListName::Skills,
                    id: victim,
                });
            }
        }

        assert_eq!(skill_ids(&editor), expected);
        for id in &removed {
            assert!(!skill_ids(&editor).contains(id));
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let mut editor = CvEditor::new();
        let ids: HashSet<String> = (0..50).map(|_| add(&mut editor, ListName::Languages)).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut editor = CvEditor::new();
        add(&mut editor, ListName::Educations);
        let before = editor.clone();

        editor.apply(Operation::UpdateItem {
            id: "missing".to_string(),
            edit: ItemEdit::Education(EducationEdit::School("MIT".to_string())),
        });

        assert_eq!(editor, before);
    }

    #[test]
    fn test_update_with_edit_for_other_list_is_noop() {
        let mut editor = CvEditor::new();
        let id = add(&mut editor, ListName::Skills);
        let before = editor.clone();

        editor.apply(Operation::UpdateItem {
            id,
            edit: ItemEdit::Language(LanguageEdit::Name("Rust".to_string())),
        });

        assert_eq!(editor, before);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut editor = CvEditor::new();
        add(&mut editor, ListName::Skills);
        let before = editor.clone();

        editor.apply(Operation::RemoveItem {
            list: ListName::Skills,
            id: "missing".to_string(),
        });

        assert_eq!(editor, before);
    }

    #[test]
    fn test_skill_level_is_clamped() {
        let mut editor = CvEditor::new();
        let id = add(&mut editor, ListName::Skills);

        editor.apply(Operation::UpdateItem {
            id: id.clone(),
            edit: ItemEdit::Skill(SkillEdit::Level(12)),
        });
        assert_eq!(editor.data().skills[0].level, 5);

        editor.apply(Operation::UpdateItem {
            id,
            edit: ItemEdit::Skill(SkillEdit::Level(0)),
        });
        assert_eq!(editor.data().skills[0].level, 1);
    }

    #[test]
    fn test_set_template() {
        let mut editor = CvEditor::new();
        assert_eq!(
            editor.apply(Operation::SetTemplate("creative".to_string())),
            Effect::Schedule
        );
        assert_eq!(editor.template(), TemplateId::Creative);

        let effect = editor.apply(Operation::SetTemplate("neon".to_string()));
        assert!(matches!(effect, Effect::Rejected(_)));
        assert_eq!(editor.template(), TemplateId::Creative);
    }

    #[test]
    fn test_invalid_email_still_updates() {
        let mut editor = CvEditor::new();
        editor.apply(Operation::UpdateField {
            field: PersonalField::Email,
            value: "ada@".to_string(),
        });

        assert_eq!(editor.data().personal_info.email, "ada@");
        assert_eq!(editor.errors().get("email"), Some("Invalid email address"));
    }

    #[test]
    fn test_empty_photo_clears() {
        let mut editor = CvEditor::new();
        editor.apply(Operation::UpdateField {
            field: PersonalField::Photo,
            value: "data:image/png;base64,AAAA".to_string(),
        });
        assert!(editor.data().personal_info.photo.is_some());

        editor.apply(Operation::UpdateField {
            field: PersonalField::Photo,
            value: String::new(),
        });
        assert!(editor.data().personal_info.photo.is_none());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut editor = CvEditor::new();
        add(&mut editor, ListName::Experiences);
        add(&mut editor, ListName::Skills);
        editor.apply(Operation::SetTemplate("bold".to_string()));
        editor.apply(Operation::UpdateField {
            field: PersonalField::Phone,
            value: "nope".to_string(),
        });

        assert_eq!(editor.apply(Operation::Reset), Effect::Cleared);
        assert_eq!(editor, CvEditor::new());
        assert_eq!(editor.data(), &CvData::default());
        assert_eq!(editor.template(), TemplateId::Elegance);
    }

    #[test]
    fn test_parse_item_edits() {
        assert_eq!(
            ItemEdit::parse(ListName::Experiences, "start_date", "2021-03").unwrap(),
            ItemEdit::Experience(ExperienceEdit::StartDate("2021-03".to_string()))
        );
        assert_eq!(
            ItemEdit::parse(ListName::Experiences, "current", "yes").unwrap(),
            ItemEdit::Experience(ExperienceEdit::Current(true))
        );
        assert_eq!(
            ItemEdit::parse(ListName::Languages, "level", "b2").unwrap(),
            ItemEdit::Language(LanguageEdit::Level(LanguageLevel::B2))
        );
        assert!(ItemEdit::parse(ListName::Skills, "level", "high").is_err());
    }

    #[test]
    fn test_parsed_skill_level_is_clamped() {
        let level = |raw: &str| ItemEdit::parse(ListName::Skills, "level", raw).unwrap();
        assert_eq!(level("300"), ItemEdit::Skill(SkillEdit::Level(5)));
        assert_eq!(level("-1"), ItemEdit::Skill(SkillEdit::Level(1)));
        assert_eq!(level(" 4 "), ItemEdit::Skill(SkillEdit::Level(4)));
        assert!(ItemEdit::parse(ListName::Educations, "company", "Acme").is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("first_name".parse::<PersonalField>().unwrap(), PersonalField::FirstName);
        assert_eq!("lastName".parse::<PersonalField>().unwrap(), PersonalField::LastName);
        assert!("age".parse::<PersonalField>().is_err());
        assert_eq!("skill".parse::<ListName>().unwrap(), ListName::Skills);
    }
}
