// src/core/persistence.rs
//! Where the document is durably written, chosen once per session

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use crate::core::service_client::CvApi;
use crate::core::store::DocumentStore;
use crate::types::envelope::{LocalEnvelope, LOCAL_STORAGE_KEY};
use crate::types::{CvData, TemplateId};

/// Everything a single save needs, captured when the edit happened
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub cv_data: CvData,
    pub template: TemplateId,
    pub is_public: bool,
}

#[derive(Clone)]
pub enum Destination {
    /// Anonymous user: one well-known key in a local store
    Local {
        store: Arc<dyn DocumentStore>,
        key: String,
    },
    /// Signed-in user: the backend keeps the document
    Remote { api: Arc<dyn CvApi> },
}

impl Destination {
    pub fn local(store: Arc<dyn DocumentStore>) -> Self {
        Self::Local {
            store,
            key: LOCAL_STORAGE_KEY.to_string(),
        }
    }

    pub fn remote(api: Arc<dyn CvApi>) -> Self {
        Self::Remote { api }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Remote { .. } => "remote",
        }
    }

    /// Full replacement write of the snapshot
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        match self {
            Self::Local { store, key } => {
                let envelope = LocalEnvelope::new(snapshot.cv_data.clone(), snapshot.template);
                let text = serde_json::to_string(&envelope)
                    .context("Failed to serialize local CV copy")?;
                store.save(key, &text).await?;
            }
            Self::Remote { api } => {
                api.save_cv(&snapshot.cv_data, snapshot.template, snapshot.is_public)
                    .await?;
            }
        }
        debug!("Persisted CV snapshot to {} destination", self.label());
        Ok(())
    }

    /// Erase the local copy. Remote documents are only ever overwritten.
    pub async fn clear_local(&self) -> Result<()> {
        if let Self::Local { store, key } = self {
            store.remove(key).await?;
        }
        Ok(())
    }
}
