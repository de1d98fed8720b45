//! Directory-backed store.
//!
//! ```text
//! <root>/
//! ├── files/          # blobs by storage key
//! ├── projects.json   # project records
//! ├── shares.json     # share grants
//! └── roles.json      # email -> role
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use super::{
    FileStorage, Project, ProjectId, ProjectStore, ProjectUpdate, Role, SaveOptions, Share,
    ShareAccess, ShareStore, StoreError, User, apply_update, new_project,
};

const PROJECTS: &str = "projects.json";
const SHARES: &str = "shares.json";
const ROLES: &str = "roles.json";
const SIGNING_CONTEXT: &str = "vitae 2026-01 signed url";

pub struct FsStore {
    root: PathBuf,
    key: [u8; 32],
    /// Serializes read-modify-write of the JSON indexes.
    index_lock: Mutex<()>,
}

impl FsStore {
    pub async fn open(root: impl Into<PathBuf>, signing_key: &str) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("files")).await?;
        Ok(Self {
            root,
            key: blake3::derive_key(SIGNING_CONTEXT, signing_key.as_bytes()),
            index_lock: Mutex::new(()),
        })
    }

    /// Resolve a storage key under `files/`, rejecting keys that escape it.
    fn blob_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join("files").join(relative))
    }

    async fn read_index<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StoreError> {
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a temp file and rename so readers never see a torn index.
    async fn write_index<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.root.join(name);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn signature(&self, key: &str, expires: i64) -> blake3::Hash {
        let message = format!("{key}\n{expires}");
        blake3::keyed_hash(&self.key, message.as_bytes())
    }

    /// Check a URL produced by `create_signed_url` against `now` (unix secs).
    pub fn verify_signed_url(&self, url: &str, now: i64) -> bool {
        let Some((base, query)) = url.split_once('?') else {
            return false;
        };
        let Some(key) = base
            .strip_prefix("file://")
            .and_then(|p| Path::new(p).strip_prefix(self.root.join("files")).ok())
            .and_then(Path::to_str)
        else {
            return false;
        };

        let mut expires = None;
        let mut sig = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", v)) => expires = v.parse::<i64>().ok(),
                Some(("sig", v)) => sig = Some(v),
                _ => {}
            }
        }

        match (expires, sig) {
            // `blake3::Hash` equality is constant time
            (Some(expires), Some(sig)) => {
                expires >= now
                    && blake3::Hash::from_hex(sig).is_ok_and(|h| h == self.signature(key, expires))
            }
            _ => false,
        }
    }
}

#[async_trait]
impl FileStorage for FsStore {
    async fn load_file(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(self.blob_path(path)?).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_file(
        &self,
        path: &str,
        bytes: &[u8],
        options: SaveOptions,
    ) -> Result<(), StoreError> {
        let target = self.blob_path(path)?;
        if !options.upsert && tokio::fs::try_exists(&target).await? {
            return Err(StoreError::Conflict(path.to_string()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String, StoreError> {
        let target = self.blob_path(path)?;
        if !tokio::fs::try_exists(&target).await? {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl);
        Ok(format!(
            "file://{}?expires={expires}&sig={}",
            target.display(),
            self.signature(path, expires).to_hex()
        ))
    }

    async fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.blob_path(path)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ProjectStore for FsStore {
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let projects: Vec<Project> = self.read_index(PROJECTS).await?;
        Ok(projects.into_iter().find(|p| &p.id == id))
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        update: ProjectUpdate,
    ) -> Result<Project, StoreError> {
        let _guard = self.index_lock.lock().await;
        let mut projects: Vec<Project> = self.read_index(PROJECTS).await?;
        let project = projects
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply_update(project, update);
        let updated = project.clone();
        self.write_index(PROJECTS, &projects).await?;
        Ok(updated)
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock().await;
        let mut projects: Vec<Project> = self.read_index(PROJECTS).await?;
        projects.retain(|p| &p.id != id);
        self.write_index(PROJECTS, &projects).await?;

        let mut shares: Vec<Share> = self.read_index(SHARES).await?;
        shares.retain(|s| &s.project_id != id);
        self.write_index(SHARES, &shares).await
    }

    async fn create_project(
        &self,
        owner: &User,
        title: &str,
        project_type: &str,
    ) -> Result<Project, StoreError> {
        let _guard = self.index_lock.lock().await;
        let mut projects: Vec<Project> = self.read_index(PROJECTS).await?;
        let project = new_project(owner, title, project_type, Utc::now());
        projects.push(project.clone());
        self.write_index(PROJECTS, &projects).await?;
        Ok(project)
    }
}

#[async_trait]
impl ShareStore for FsStore {
    async fn get_permission(
        &self,
        project: &ProjectId,
        user_id: &str,
    ) -> Result<Option<ShareAccess>, StoreError> {
        let shares: Vec<Share> = self.read_index(SHARES).await?;
        Ok(shares
            .into_iter()
            .find(|s| &s.project_id == project && s.user_id == user_id)
            .map(|s| s.access))
    }

    async fn role_for_email(&self, email: &str) -> Result<Role, StoreError> {
        let roles: FxHashMap<String, Role> = self.read_index(ROLES).await?;
        Ok(roles.get(email).copied().unwrap_or_default())
    }

    async fn create_share(&self, share: Share) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock().await;
        let mut shares: Vec<Share> = self.read_index(SHARES).await?;
        shares.retain(|s| !(s.project_id == share.project_id && s.user_id == share.user_id));
        shares.push(share);
        self.write_index(SHARES, &shares).await
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock().await;
        let mut roles: FxHashMap<String, Role> = self.read_index(ROLES).await?;
        roles.insert(email.to_string(), role);
        self.write_index(ROLES, &roles).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn owner() -> User {
        User {
            id: "alice".into(),
            email: "alice@example.com".into(),
        }
    }

    async fn store(dir: &TempDir) -> FsStore {
        FsStore::open(dir.path(), "secret").await.unwrap()
    }

    #[tokio::test]
    async fn test_file_roundtrip_and_upsert() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        store
            .save_file("alice/cv.typ", b"= Alice", SaveOptions::default())
            .await
            .unwrap();
        assert_eq!(store.load_text("alice/cv.typ").await.unwrap(), "= Alice");

        let again = store
            .save_file("alice/cv.typ", b"= Bob", SaveOptions::default())
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        store
            .save_file("alice/cv.typ", b"= Bob", SaveOptions::UPSERT)
            .await
            .unwrap();
        assert_eq!(store.load_text("alice/cv.typ").await.unwrap(), "= Bob");

        store.delete_file("alice/cv.typ").await.unwrap();
        assert!(matches!(
            store.load_file("alice/cv.typ").await,
            Err(StoreError::NotFound(_))
        ));
        // deleting twice is fine
        store.delete_file("alice/cv.typ").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        for key in ["../x", "/etc/passwd", "", "a/../../b"] {
            assert!(
                matches!(store.load_file(key).await, Err(StoreError::InvalidPath(_))),
                "{key} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_project_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let project = store.create_project(&owner(), "CV", "resume").await.unwrap();
        let loaded = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(loaded, project);

        let updated = store
            .update_project(&project.id, ProjectUpdate::touch(project.updated_at))
            .await
            .unwrap();
        assert!(updated.updated_at > project.updated_at);

        store.delete_project(&project.id).await.unwrap();
        assert!(store.get_project(&project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shares_and_roles() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let id = ProjectId::from("p1");

        assert_eq!(store.get_permission(&id, "bob").await.unwrap(), None);
        store
            .create_share(Share {
                project_id: id.clone(),
                user_id: "bob".into(),
                access: ShareAccess::Read,
            })
            .await
            .unwrap();
        store
            .create_share(Share {
                project_id: id.clone(),
                user_id: "bob".into(),
                access: ShareAccess::Edit,
            })
            .await
            .unwrap();
        assert_eq!(
            store.get_permission(&id, "bob").await.unwrap(),
            Some(ShareAccess::Edit)
        );

        assert_eq!(store.role_for_email("boss@x.com").await.unwrap(), Role::Member);
        store.set_role("boss@x.com", Role::Cxo).await.unwrap();
        assert_eq!(store.role_for_email("boss@x.com").await.unwrap(), Role::Cxo);
    }

    #[tokio::test]
    async fn test_signed_url() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store
            .save_file("alice/cv.pdf", b"%PDF", SaveOptions::UPSERT)
            .await
            .unwrap();

        let url = store
            .create_signed_url("alice/cv.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        let now = Utc::now().timestamp();
        assert!(store.verify_signed_url(&url, now));
        assert!(!store.verify_signed_url(&url, now + 120));
        assert!(!store.verify_signed_url(&url.replace("cv.pdf", "other.pdf"), now));

        let missing = store
            .create_signed_url("alice/none.pdf", Duration::from_secs(60))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }
}
