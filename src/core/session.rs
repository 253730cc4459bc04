// src/core/session.rs
//! A live editing session: the in-memory document, its persistence
//! destination and the autosave scheduler tied together.
//!
//! `CvSession::open` hydrates before the scheduler exists, so no save can
//! ever race ahead of the initial load. When the load itself fails the
//! session stays editable but never writes, so an unreadable CV is not
//! overwritten with an empty one.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::autosave::{Autosave, SaveStatus, DEFAULT_QUIET_PERIOD};
use crate::core::clipboard::ClipboardWriter;
use crate::core::editor::{CvEditor, Effect, Operation};
use crate::core::persistence::{Destination, Snapshot};
use crate::core::print::{PrintJob, PrintRenderer};
use crate::core::validation::ValidationErrors;
use crate::error::CvError;
use crate::types::envelope::{
    CvAnalytics, ExportEnvelope, ImportedCv, LocalEnvelope, Visibility,
};
use crate::types::{CvData, TemplateId};
use crate::utils::{export_file_name, share_url};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub quiet_period: Duration,
    pub site_origin: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            site_origin: "http://localhost:3000".to_string(),
        }
    }
}

pub struct CvSession {
    editor: CvEditor,
    destination: Destination,
    visibility: Visibility,
    autosave: Autosave,
    site_origin: String,
    hydrate_warning: Option<String>,
    /// Edits not yet written by an explicit flush; cleared by a local reset
    unsaved: bool,
}

impl CvSession {
    /// Hydrate from `destination`, then start autosaving to it
    pub async fn open(destination: Destination, options: SessionOptions) -> Self {
        let mut editor = CvEditor::new();
        let mut visibility = Visibility::default();
        let mut hydrate_warning = None;

        match &destination {
            Destination::Local { store, key } => match store.load(key).await {
                Ok(Some(text)) => match LocalEnvelope::parse_lenient(&text) {
                    Some((mut cv_data, template)) => {
                        repair_ids(&mut cv_data);
                        editor.replace(cv_data, Some(template));
                        info!("Hydrated CV from local copy");
                    }
                    None => warn!("Ignoring unreadable local copy, starting with an empty CV"),
                },
                Ok(None) => debug!("No local copy yet, starting with an empty CV"),
                Err(e) => {
                    warn!("Failed to read local copy: {:#}", e);
                    hydrate_warning = Some(format!("{:#}", e));
                }
            },
            Destination::Remote { api } => match api.fetch_cv().await {
                Ok(Some(mut remote)) => {
                    repair_ids(&mut remote.cv_data);
                    let template = remote
                        .template
                        .as_deref()
                        .and_then(|raw| raw.parse::<TemplateId>().ok())
                        .unwrap_or_default();
                    editor.replace(remote.cv_data, Some(template));
                    visibility = Visibility {
                        is_public: remote.is_public,
                        slug: remote.slug,
                    };
                    info!("Hydrated CV from remote profile");
                }
                Ok(None) => debug!("No remote CV yet, starting with an empty CV"),
                Err(e) => {
                    warn!("Failed to fetch remote CV: {:#}", e);
                    hydrate_warning = Some(format!("{:#}", e));
                }
            },
        }

        let autosave = Autosave::spawn(destination.clone(), options.quiet_period);

        Self {
            editor,
            destination,
            visibility,
            autosave,
            site_origin: options.site_origin,
            hydrate_warning,
            unsaved: false,
        }
    }

    // ===== Read access =====

    pub fn data(&self) -> &CvData {
        self.editor.data()
    }

    pub fn template(&self) -> TemplateId {
        self.editor.template()
    }

    pub fn errors(&self) -> &ValidationErrors {
        self.editor.errors()
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn is_remote(&self) -> bool {
        self.destination.is_remote()
    }

    /// Set when the initial load failed and the session started empty
    pub fn hydrate_warning(&self) -> Option<&str> {
        self.hydrate_warning.as_deref()
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.autosave.status()
    }

    pub fn current_status(&self) -> SaveStatus {
        self.autosave.current_status()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            cv_data: self.editor.data().clone(),
            template: self.editor.template(),
            is_public: self.visibility.is_public,
        }
    }

    // ===== Editing =====

    /// Apply one edit and schedule the matching persistence work
    pub fn dispatch(&mut self, op: Operation) -> Effect {
        let effect = self.editor.apply(op);

        match &effect {
            Effect::Schedule | Effect::Added(_) => self.schedule_save(),
            Effect::Cleared => {
                if self.destination.is_remote() {
                    self.schedule_save();
                } else {
                    self.unsaved = false;
                    if self.saves_allowed() {
                        self.autosave.clear_local();
                    }
                }
            }
            Effect::Rejected(reason) => warn!("Edit rejected: {}", reason),
        }

        effect
    }

    /// Replace the document with a validated import, all or nothing
    pub fn import(&mut self, text: &str) -> Result<(), CvError> {
        let imported = ImportedCv::parse(text)?;
        self.editor.replace(imported.cv_data, imported.template);
        self.schedule_save();
        info!("Imported CV document");
        Ok(())
    }

    pub async fn import_file(&mut self, path: &Path) -> Result<(), CvError> {
        let text = tokio::fs::read_to_string(path).await?;
        self.import(&text)
    }

    pub fn export(&self) -> ExportEnvelope {
        ExportEnvelope::new(self.editor.data().clone(), self.editor.template())
    }

    /// Write the export file into `dir` and return its path
    pub async fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, CvError> {
        let envelope = self.export();
        let info = &envelope.cv_data.personal_info;
        let path = dir.join(export_file_name(
            &info.first_name,
            &info.last_name,
            envelope.exported_at,
        ));
        self.export_to_file(&envelope, &path).await?;
        Ok(path)
    }

    pub async fn export_to_file(&self, envelope: &ExportEnvelope, path: &Path) -> Result<(), CvError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, envelope.to_json()?).await?;
        info!("Exported CV to {}", path.display());
        Ok(())
    }

    // ===== Sharing =====

    /// Flip public/private on the backend. Needs a signed-in session.
    pub async fn toggle_public(&mut self) -> Result<&Visibility, CvError> {
        let Destination::Remote { api } = &self.destination else {
            return Err(CvError::Unauthenticated("sharing a CV needs an account"));
        };

        let visibility = api.toggle_visibility().await.map_err(CvError::remote)?;
        info!(
            "CV is now {}",
            if visibility.is_public { "public" } else { "private" }
        );
        self.visibility = visibility;
        Ok(&self.visibility)
    }

    /// Canonical public address, when the CV is public and has a slug
    pub fn share_url(&self) -> Option<String> {
        if !self.visibility.is_public {
            return None;
        }
        self.visibility
            .slug
            .as_deref()
            .filter(|slug| !slug.is_empty())
            .map(|slug| share_url(&self.site_origin, slug))
    }

    pub fn copy_share_url(&self, clipboard: &dyn ClipboardWriter) -> Result<String, CvError> {
        let url = self.share_url().ok_or(CvError::NotPublic)?;
        clipboard
            .write_text(&url)
            .map_err(|e| CvError::Clipboard(format!("{:#}", e)))?;
        Ok(url)
    }

    pub async fn analytics(&self) -> Result<CvAnalytics, CvError> {
        let Destination::Remote { api } = &self.destination else {
            return Err(CvError::Unauthenticated("analytics need an account"));
        };
        api.fetch_analytics().await.map_err(CvError::remote)
    }

    // ===== Output =====

    /// Render the printable document. Refused while the CV has no name.
    pub fn print(&self, renderer: &dyn PrintRenderer) -> Result<Option<PathBuf>, CvError> {
        if !self.editor.data().has_name() {
            return Err(CvError::MissingName);
        }
        let job = PrintJob::new(self.editor.data(), self.editor.template());
        renderer
            .print(&job)
            .map_err(|e| CvError::Print(format!("{:#}", e)))
    }

    // ===== Lifecycle =====

    /// Persist the current state now instead of waiting for the quiet period.
    /// Nothing is written when no edit happened since the last flush or a
    /// local reset, so a reset copy stays erased.
    pub async fn flush(&mut self) -> Result<(), CvError> {
        if !self.unsaved {
            debug!("Nothing to flush");
            return Ok(());
        }
        if let Some(reason) = &self.hydrate_warning {
            return Err(CvError::Persistence(format!(
                "saving is disabled because your saved CV could not be loaded ({})",
                reason
            )));
        }
        self.autosave.flush(self.snapshot()).await?;
        self.unsaved = false;
        Ok(())
    }

    fn saves_allowed(&self) -> bool {
        self.hydrate_warning.is_none()
    }

    fn schedule_save(&mut self) {
        self.unsaved = true;
        if self.saves_allowed() {
            self.autosave.schedule(self.snapshot());
        } else {
            debug!("Edit kept in memory only, the saved CV was never loaded");
        }
    }

    /// Stop the scheduler; a write already in flight completes, a pending one is dropped
    pub async fn close(self) {
        self.autosave.shutdown().await;
    }
}

/// Hydrated documents may come from older clients; every item must end up
/// with a unique, non-empty id before ids are used for edits
fn repair_ids(cv: &mut CvData) {
    let repaired = cv.repair_ids();
    if repaired > 0 {
        warn!("Assigned fresh ids to {} item(s) with a blank or duplicate id", repaired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::MemoryClipboard;
    use crate::core::editor::{ExperienceEdit, ItemEdit, ListName, PersonalField};
    use crate::core::service_client::CvApi;
    use crate::core::store::MemoryStore;
    use crate::types::envelope::{RemoteCv, LOCAL_STORAGE_KEY};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::time::sleep;

    struct FakeApi {
        stored: Mutex<Option<RemoteCv>>,
        puts: Mutex<Vec<(CvData, TemplateId, bool)>>,
    }

    impl FakeApi {
        fn new(stored: Option<RemoteCv>) -> Arc<Self> {
            Arc::new(Self {
                stored: Mutex::new(stored),
                puts: Mutex::new(Vec::new()),
            })
        }

        fn puts(&self) -> Vec<(CvData, TemplateId, bool)> {
            self.puts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CvApi for FakeApi {
        async fn fetch_cv(&self) -> anyhow::Result<Option<RemoteCv>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn save_cv(
            &self,
            cv_data: &CvData,
            template: TemplateId,
            is_public: bool,
        ) -> anyhow::Result<()> {
            self.puts
                .lock()
                .unwrap()
                .push((cv_data.clone(), template, is_public));
            Ok(())
        }

        async fn toggle_visibility(&self) -> anyhow::Result<Visibility> {
            let mut stored = self.stored.lock().unwrap();
            let remote = stored.get_or_insert_with(|| RemoteCv {
                cv_data: CvData::default(),
                template: None,
                is_public: false,
                slug: None,
            });
            remote.is_public = !remote.is_public;
            remote.slug = remote.is_public.then(|| "ada-lovelace-x7".to_string());
            Ok(Visibility {
                is_public: remote.is_public,
                slug: remote.slug.clone(),
            })
        }

        async fn fetch_analytics(&self) -> anyhow::Result<CvAnalytics> {
            Ok(CvAnalytics {
                views: 12,
                downloads: 3,
            })
        }
    }

    /// Backend whose GET fails; counts the PUTs that still get through
    #[derive(Default)]
    struct UnreachableApi {
        puts: Mutex<usize>,
    }

    #[async_trait]
    impl CvApi for UnreachableApi {
        async fn fetch_cv(&self) -> anyhow::Result<Option<RemoteCv>> {
            anyhow::bail!("CV fetch failed with status 500 Internal Server Error")
        }

        async fn save_cv(&self, _: &CvData, _: TemplateId, _: bool) -> anyhow::Result<()> {
            *self.puts.lock().unwrap() += 1;
            Ok(())
        }

        async fn toggle_visibility(&self) -> anyhow::Result<Visibility> {
            anyhow::bail!("unreachable")
        }

        async fn fetch_analytics(&self) -> anyhow::Result<CvAnalytics> {
            anyhow::bail!("unreachable")
        }
    }

    struct CountingRenderer {
        calls: Mutex<usize>,
    }

    impl PrintRenderer for CountingRenderer {
        fn print(&self, _job: &PrintJob) -> anyhow::Result<Option<PathBuf>> {
            *self.calls.lock().unwrap() += 1;
            Ok(None)
        }
    }

    fn options() -> SessionOptions {
        SessionOptions {
            quiet_period: DEFAULT_QUIET_PERIOD,
            site_origin: "https://intowork.fr".to_string(),
        }
    }

    fn named_cv() -> CvData {
        let mut cv = CvData::default();
        cv.personal_info.first_name = "Ada".to_string();
        cv.personal_info.last_name = "Lovelace".to_string();
        cv
    }

    async fn local_session(store: &Arc<MemoryStore>) -> CvSession {
        CvSession::open(Destination::local(store.clone()), options()).await
    }

    #[tokio::test]
    async fn test_local_hydrate_reproduces_saved_document() {
        let store = Arc::new(MemoryStore::new());
        let text = serde_json::json!({
            "cvData": named_cv(),
            "template": "bold",
            "savedAt": "2026-10-19T08:00:00Z"
        })
        .to_string();
        store.insert(LOCAL_STORAGE_KEY, &text);

        let session = local_session(&store).await;
        assert_eq!(session.data(), &named_cv());
        assert_eq!(session.template(), TemplateId::Bold);
        assert!(session.hydrate_warning().is_none());
    }

    #[tokio::test]
    async fn test_malformed_local_copy_falls_back_to_empty() {
        let store = Arc::new(MemoryStore::new());
        store.insert(LOCAL_STORAGE_KEY, "definitely not json");

        let session = local_session(&store).await;
        assert_eq!(session.data(), &CvData::default());
        assert_eq!(session.template(), TemplateId::Elegance);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_edits_are_autosaved() {
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;

        session.dispatch(Operation::UpdateField {
            field: PersonalField::FirstName,
            value: "Ada".to_string(),
        });
        assert!(store.get(LOCAL_STORAGE_KEY).is_none());

        sleep(Duration::from_secs(3)).await;
        let saved = store.get(LOCAL_STORAGE_KEY).unwrap();
        let (cv, template) = LocalEnvelope::parse_lenient(&saved).unwrap();
        assert_eq!(cv.personal_info.first_name, "Ada");
        assert_eq!(template, TemplateId::Elegance);
        assert!(matches!(session.current_status(), SaveStatus::Saved { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_erases_local_copy() {
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;

        session.dispatch(Operation::AddItem(ListName::Skills));
        session.flush().await.unwrap();
        assert!(store.get(LOCAL_STORAGE_KEY).is_some());

        session.dispatch(Operation::AddItem(ListName::Skills));
        assert_eq!(session.dispatch(Operation::Reset), Effect::Cleared);
        sleep(Duration::from_secs(3)).await;

        assert!(store.get(LOCAL_STORAGE_KEY).is_none());
        assert_eq!(session.data(), &CvData::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_after_reset_keeps_local_copy_erased() {
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;

        session.flush().await.unwrap();
        assert!(store.get(LOCAL_STORAGE_KEY).is_none());

        session.dispatch(Operation::AddItem(ListName::Experiences));
        session.flush().await.unwrap();
        assert!(store.get(LOCAL_STORAGE_KEY).is_some());

        session.dispatch(Operation::Reset);
        session.flush().await.unwrap();
        sleep(Duration::from_secs(3)).await;
        assert!(store.get(LOCAL_STORAGE_KEY).is_none());

        session.dispatch(Operation::AddItem(ListName::Skills));
        session.flush().await.unwrap();
        let (cv, _) = LocalEnvelope::parse_lenient(&store.get(LOCAL_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(cv.skills.len(), 1);
        assert!(cv.experiences.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_remote_load_never_overwrites_remote_cv() {
        let api = Arc::new(UnreachableApi::default());
        let mut session = CvSession::open(Destination::remote(api.clone()), options()).await;
        assert!(session.hydrate_warning().is_some());

        assert_eq!(
            session.dispatch(Operation::SetTemplate("bold".to_string())),
            Effect::Schedule
        );
        session.dispatch(Operation::Reset);
        sleep(Duration::from_secs(3)).await;

        assert!(matches!(session.flush().await, Err(CvError::Persistence(_))));
        assert_eq!(*api.puts.lock().unwrap(), 0);
        assert_eq!(session.data(), &CvData::default());
    }

    #[tokio::test]
    async fn test_hydrate_repairs_duplicate_ids() {
        let store = Arc::new(MemoryStore::new());
        let text = serde_json::json!({
            "cvData": {
                "skills": [
                    {"id": "s1", "name": "Rust", "level": 5},
                    {"id": "s1", "name": "Go", "level": 3},
                    {"id": "", "name": "SQL", "level": 4}
                ]
            },
            "template": "minimal"
        })
        .to_string();
        store.insert(LOCAL_STORAGE_KEY, &text);

        let mut session = local_session(&store).await;
        let ids: Vec<String> = session.data().skills.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids[0], "s1");
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_ne!(ids[1], ids[0]);
        assert_ne!(ids[2], ids[1]);

        session.dispatch(Operation::RemoveItem {
            list: ListName::Skills,
            id: "s1".to_string(),
        });
        let names: Vec<&str> = session.data().skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Go", "SQL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_quota_failure_keeps_memory_state() {
        let store = Arc::new(MemoryStore::with_quota(16));
        let mut session = local_session(&store).await;

        session.dispatch(Operation::UpdateField {
            field: PersonalField::Summary,
            value: "A long enough summary to blow the quota".to_string(),
        });
        sleep(Duration::from_secs(3)).await;

        assert!(matches!(session.current_status(), SaveStatus::Failed { .. }));
        assert_eq!(
            session.data().personal_info.summary,
            "A long enough summary to blow the quota"
        );
        assert!(session.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_toggle_public_requires_account() {
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;
        session.dispatch(Operation::UpdateField {
            field: PersonalField::FirstName,
            value: "Ada".to_string(),
        });
        let before = session.data().clone();

        let result = session.toggle_public().await;
        assert!(matches!(result, Err(CvError::Unauthenticated(_))));
        assert_eq!(session.data(), &before);
        assert_eq!(session.visibility(), &Visibility::default());
        assert!(session.analytics().await.is_err());
    }

    #[tokio::test]
    async fn test_remote_hydrate_and_share() {
        let api = FakeApi::new(Some(RemoteCv {
            cv_data: named_cv(),
            template: Some("executive".to_string()),
            is_public: false,
            slug: None,
        }));
        let mut session = CvSession::open(Destination::remote(api.clone()), options()).await;

        assert_eq!(session.data(), &named_cv());
        assert_eq!(session.template(), TemplateId::Executive);
        assert_eq!(session.share_url(), None);

        let clipboard = MemoryClipboard::new();
        assert!(matches!(
            session.copy_share_url(&clipboard),
            Err(CvError::NotPublic)
        ));

        let visibility = session.toggle_public().await.unwrap().clone();
        assert!(visibility.is_public);
        assert_eq!(
            session.share_url().as_deref(),
            Some("https://intowork.fr/cv/ada-lovelace-x7")
        );

        let copied = session.copy_share_url(&clipboard).unwrap();
        assert_eq!(clipboard.content(), Some(copied));

        session.toggle_public().await.unwrap();
        assert_eq!(session.share_url(), None);

        let analytics = session.analytics().await.unwrap();
        assert_eq!(analytics.views, 12);
    }

    #[tokio::test]
    async fn test_remote_unknown_template_falls_back_to_default() {
        let api = FakeApi::new(Some(RemoteCv {
            cv_data: named_cv(),
            template: Some("retro".to_string()),
            is_public: true,
            slug: Some("abc".to_string()),
        }));
        let session = CvSession::open(Destination::remote(api), options()).await;
        assert_eq!(session.template(), TemplateId::Elegance);
        assert!(session.visibility().is_public);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_save_carries_visibility() {
        let api = FakeApi::new(None);
        let mut session = CvSession::open(Destination::remote(api.clone()), options()).await;

        session.toggle_public().await.unwrap();
        let id = match session.dispatch(Operation::AddItem(ListName::Experiences)) {
            Effect::Added(id) => id,
            other => panic!("unexpected {:?}", other),
        };
        session.dispatch(Operation::UpdateItem {
            id,
            edit: ItemEdit::Experience(ExperienceEdit::Company("Acme".to_string())),
        });
        sleep(Duration::from_secs(3)).await;

        let puts = api.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0.experiences[0].company, "Acme");
        assert!(puts[0].2);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;
        session.dispatch(Operation::SetTemplate("creative".to_string()));
        let before = session.data().clone();

        let err = session.import(r#"{"template": "bold"}"#).unwrap_err();
        assert!(matches!(err, CvError::InvalidImport(_)));
        assert_eq!(session.data(), &before);
        assert_eq!(session.template(), TemplateId::Creative);

        session
            .import(r#"{"cvData": {"personalInfo": {"firstName": "Grace"}}}"#)
            .unwrap();
        assert_eq!(session.data().personal_info.first_name, "Grace");
        assert_eq!(session.template(), TemplateId::Creative);
    }

    #[tokio::test]
    async fn test_export_then_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;
        session.import(&ExportEnvelope::new(named_cv(), TemplateId::Minimal).to_json().unwrap())
            .unwrap();

        let path = session.export_to_dir(dir.path()).await.unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("cv-ada-lovelace-"));

        session.dispatch(Operation::Reset);
        session.import_file(&path).await.unwrap();
        assert_eq!(session.data(), &named_cv());
        assert_eq!(session.template(), TemplateId::Minimal);
    }

    #[tokio::test]
    async fn test_print_requires_a_name() {
        let store = Arc::new(MemoryStore::new());
        let mut session = local_session(&store).await;
        let renderer = CountingRenderer {
            calls: Mutex::new(0),
        };

        assert!(matches!(session.print(&renderer), Err(CvError::MissingName)));
        assert_eq!(*renderer.calls.lock().unwrap(), 0);

        session.dispatch(Operation::UpdateField {
            field: PersonalField::LastName,
            value: "Lovelace".to_string(),
        });
        assert!(session.print(&renderer).is_ok());
        assert_eq!(*renderer.calls.lock().unwrap(), 1);
    }
}
