pub mod cli;
pub mod core;
pub mod error;
pub mod repl;
pub mod types;
pub mod utils;

pub use crate::core::{CvSession, Operation, SessionOptions};
pub use error::CvError;
pub use types::{CvData, TemplateId};
