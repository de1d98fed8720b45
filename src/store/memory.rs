//! In-process store with fault injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{
    Backend, FileStorage, Identity, Project, ProjectId, ProjectStore, ProjectUpdate, Role, SaveOptions,
    Share, ShareAccess, ShareStore, StaticIdentity, StoreError, User, apply_update, new_project,
};

/// Ordered record of collaborator calls shared between fakes, so tests can
/// assert "compile happened before write".
pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct State {
    files: FxHashMap<String, Vec<u8>>,
    projects: FxHashMap<ProjectId, Project>,
    shares: Vec<Share>,
    roles: FxHashMap<String, Role>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    journal: Journal,
    fail_uploads: AtomicBool,
    fail_updates: AtomicBool,
    uploads: AtomicUsize,
    /// Artificial latency for `save_file`, observable under paused time.
    upload_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_journal(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            ..Self::default()
        })
    }

    pub fn backend(self: &Arc<Self>, user: User) -> Backend {
        let identity: Arc<dyn Identity> = Arc::new(StaticIdentity::new(user));
        Backend::from_store(self.clone(), identity)
    }

    /// Seed a project owned by `owner` with `source` as its text.
    pub fn seed(&self, owner: &User, source: &str) -> Project {
        let project = new_project(owner, "Resume", "resume", Utc::now());
        let mut state = self.state.lock();
        state
            .files
            .insert(project.typ_path.clone(), source.as_bytes().to_vec());
        state.projects.insert(project.id.clone(), project.clone());
        project
    }

    pub fn grant(&self, project: &ProjectId, user_id: &str, access: ShareAccess) {
        self.state.lock().shares.push(Share {
            project_id: project.clone(),
            user_id: user_id.to_string(),
            access,
        });
    }

    pub fn set_role_now(&self, email: &str, role: Role) {
        self.state.lock().roles.insert(email.to_string(), role);
    }

    /// Simulate another client saving: new text and a newer marker.
    pub fn touch_remote(&self, id: &ProjectId, source: &str) {
        let mut state = self.state.lock();
        let Some(project) = state.projects.get_mut(id) else {
            return;
        };
        project.updated_at += chrono::Duration::seconds(1);
        let path = project.typ_path.clone();
        state.files.insert(path, source.as_bytes().to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.file(path).map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.state.lock().projects.get(id).cloned()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock() = Some(delay);
    }

    /// Number of successful `save_file` calls.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn record(&self, entry: String) {
        self.journal.lock().push(entry);
    }
}

#[async_trait]
impl FileStorage for MemoryStore {
    async fn load_file(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.state
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn save_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: SaveOptions,
    ) -> Result<(), StoreError> {
        let delay = *self.upload_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("upload rejected".into()));
        }

        let mut state = self.state.lock();
        if !options.upsert && state.files.contains_key(path) {
            return Err(StoreError::Conflict(path.to_string()));
        }
        state.files.insert(path.to_string(), bytes.to_vec());
        drop(state);

        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.record(format!("save {path}"));
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String, StoreError> {
        if !self.state.lock().files.contains_key(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(format!("memory://{path}?ttl={}", ttl.as_secs()))
    }

    async fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        self.state.lock().files.remove(path);
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.state.lock().projects.get(id).cloned())
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        update: ProjectUpdate,
    ) -> Result<Project, StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("metadata update rejected".into()));
        }
        let mut state = self.state.lock();
        let project = state
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply_update(project, update);
        let updated = project.clone();
        drop(state);

        self.record(format!("update {id}"));
        Ok(updated)
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.projects.remove(id);
        state.shares.retain(|s| &s.project_id != id);
        Ok(())
    }

    async fn create_project(
        &self,
        owner: &User,
        title: &str,
        project_type: &str,
    ) -> Result<Project, StoreError> {
        let project = new_project(owner, title, project_type, Utc::now());
        self.state
            .lock()
            .projects
            .insert(project.id.clone(), project.clone());
        Ok(project)
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn get_permission(
        &self,
        project: &ProjectId,
        user_id: &str,
    ) -> Result<Option<ShareAccess>, StoreError> {
        Ok(self
            .state
            .lock()
            .shares
            .iter()
            .find(|s| &s.project_id == project && s.user_id == user_id)
            .map(|s| s.access))
    }

    async fn role_for_email(&self, email: &str) -> Result<Role, StoreError> {
        Ok(self
            .state
            .lock()
            .roles
            .get(email)
            .copied()
            .unwrap_or_default())
    }

    async fn create_share(&self, share: Share) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .shares
            .retain(|s| !(s.project_id == share.project_id && s.user_id == share.user_id));
        state.shares.push(share);
        Ok(())
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<(), StoreError> {
        self.set_role_now(email, role);
        Ok(())
    }
}
