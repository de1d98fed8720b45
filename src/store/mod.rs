//! Persistence collaborators.
//!
//! The editor core never talks to a database directly. It goes through
//! four narrow contracts:
//!
//! | Trait         | Covers                                          |
//! |---------------|-------------------------------------------------|
//! | `FileStorage` | source, PDF and thumbnail blobs by storage key  |
//! | `ProjectStore`| project records (owner, paths, `updated_at`)    |
//! | `ShareStore`  | per-user grants and the role override by email  |
//! | `Identity`    | who is signed in                                |
//!
//! Backends:
//! - [`FsStore`]: directory backed, used by the CLI
//! - `MemoryStore`: in-process with fault injection, used by tests

mod fs;
#[cfg(test)]
pub mod memory;

pub use fs::FsStore;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Records
// ============================================================================

/// Opaque project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// A project record. `typ_path` and `thumbnail_path` are storage keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: String,
    pub title: String,
    pub typ_path: String,
    pub thumbnail_path: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub project_type: String,
}

impl Project {
    /// Storage key of the compiled PDF, next to the source.
    pub fn pdf_path(&self) -> String {
        match self.typ_path.strip_suffix(".typ") {
            Some(stem) => format!("{stem}.pdf"),
            None => format!("{}.pdf", self.typ_path),
        }
    }
}

/// Partial update of a project record. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub thumbnail_path: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectUpdate {
    pub fn touch(at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(at),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareAccess {
    Read,
    Edit,
}

/// Role override looked up by email. `Cxo` can edit every project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Cxo,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "cxo" => Ok(Self::Cxo),
            other => Err(format!("unknown role `{other}` (expected member or cxo)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub project_id: ProjectId,
    pub user_id: String,
    pub access: ShareAccess,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Overwrite an existing blob instead of failing.
    pub upsert: bool,
}

impl SaveOptions {
    pub const UPSERT: Self = Self { upsert: true };
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("`{0}` already exists")]
    Conflict(String),

    #[error("invalid storage key `{0}`")]
    InvalidPath(String),

    #[error("`{0}` is not valid UTF-8 text")]
    NotText(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("corrupt store index")]
    Serde(#[from] serde_json::Error),
}

// ============================================================================
// Contracts
// ============================================================================

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn load_file(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    async fn save_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: SaveOptions,
    ) -> Result<(), StoreError>;

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String, StoreError>;

    async fn delete_file(&self, path: &str) -> Result<(), StoreError>;

    async fn load_text(&self, path: &str) -> Result<String, StoreError> {
        let bytes = self.load_file(path).await?;
        String::from_utf8(bytes).map_err(|_| StoreError::NotText(path.to_string()))
    }
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError>;

    /// Apply `update` and return the stored record.
    ///
    /// `updated_at` is strictly increasing per project: a requested stamp
    /// that does not move past the current one is bumped.
    async fn update_project(
        &self,
        id: &ProjectId,
        update: ProjectUpdate,
    ) -> Result<Project, StoreError>;

    async fn delete_project(&self, id: &ProjectId) -> Result<(), StoreError>;

    async fn create_project(
        &self,
        owner: &User,
        title: &str,
        project_type: &str,
    ) -> Result<Project, StoreError>;
}

#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn get_permission(
        &self,
        project: &ProjectId,
        user_id: &str,
    ) -> Result<Option<ShareAccess>, StoreError>;

    async fn role_for_email(&self, email: &str) -> Result<Role, StoreError>;

    async fn create_share(&self, share: Share) -> Result<(), StoreError>;

    async fn set_role(&self, email: &str, role: Role) -> Result<(), StoreError>;
}

pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn sign_out(&self);
}

/// Identity fixed at startup (the CLI has no sign-in flow).
pub struct StaticIdentity {
    user: Mutex<Option<User>>,
}

impl StaticIdentity {
    pub fn new(user: User) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.lock().clone()
    }

    fn sign_out(&self) {
        self.user.lock().take();
    }
}

/// The collaborator set handed to each session.
#[derive(Clone)]
pub struct Backend {
    pub files: Arc<dyn FileStorage>,
    pub projects: Arc<dyn ProjectStore>,
    pub shares: Arc<dyn ShareStore>,
    pub identity: Arc<dyn Identity>,
}

impl Backend {
    /// Use one store for files, projects and shares.
    pub fn from_store<S>(store: Arc<S>, identity: Arc<dyn Identity>) -> Self
    where
        S: FileStorage + ProjectStore + ShareStore + 'static,
    {
        Self {
            files: store.clone(),
            projects: store.clone(),
            shares: store,
            identity,
        }
    }
}

// ============================================================================
// Helpers shared by backends
// ============================================================================

/// Derive a short project id from its owner, title and creation time.
fn new_project_id(owner: &str, title: &str, now: DateTime<Utc>) -> ProjectId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(owner.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(&now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let hex = hasher.finalize().to_hex();
    ProjectId(hex[..12].to_string())
}

fn new_project(owner: &User, title: &str, project_type: &str, now: DateTime<Utc>) -> Project {
    let id = new_project_id(&owner.id, title, now);
    Project {
        typ_path: format!("{}/{id}.typ", owner.id),
        thumbnail_path: Some(format!("{}/{id}.svg", owner.id)),
        id,
        owner_id: owner.id.clone(),
        title: title.to_string(),
        updated_at: now,
        project_type: project_type.to_string(),
    }
}

/// Apply an update, keeping `updated_at` strictly increasing.
fn apply_update(project: &mut Project, update: ProjectUpdate) {
    if let Some(title) = update.title {
        project.title = title;
    }
    if let Some(thumbnail) = update.thumbnail_path {
        project.thumbnail_path = Some(thumbnail);
    }
    if let Some(at) = update.updated_at {
        let floor = project.updated_at + chrono::Duration::milliseconds(1);
        project.updated_at = at.max(floor);
    }
}
