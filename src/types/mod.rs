pub mod cv_data;
pub mod envelope;

pub use cv_data::{CvData, LanguageLevel, TemplateId};
pub use envelope::{CvAnalytics, ExportEnvelope, ImportedCv, LocalEnvelope, Visibility};
