// src/core/mod.rs
//! CV document store: editing, persistence policy and output

pub mod autosave;
pub mod clipboard;
pub mod config_manager;
pub mod editor;
pub mod persistence;
pub mod print;
pub mod service_client;
pub mod session;
pub mod store;
pub mod validation;

pub use autosave::{Autosave, SaveStatus};
pub use config_manager::{AppConfig, ConfigManager};
pub use editor::{CvEditor, Effect, ItemEdit, ListName, Operation, PersonalField};
pub use persistence::{Destination, Snapshot};
pub use print::{HtmlFileRenderer, PrintJob, PrintRenderer};
pub use service_client::{CvApi, RemoteCvClient};
pub use session::{CvSession, SessionOptions};
pub use store::{DocumentStore, FileStore, MemoryStore};
