//! Common utilities shared across CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::runtime::Runtime;

use crate::config::VitaeConfig;
use crate::engine::typeset::TypstEngine;
use crate::engine::{Compiler, CompilerGateway};
use crate::session::SessionOptions;
use crate::store::{Backend, FsStore, Identity, Project, ProjectId, StaticIdentity, User};

/// Build the multi-threaded runtime every command runs on.
pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vitae")
        .build()
        .context("Failed to start async runtime")
}

/// Store, identity and engine wiring for one invocation.
pub struct App {
    pub config: VitaeConfig,
    pub store: Arc<FsStore>,
    pub backend: Backend,
    pub user: User,
}

impl App {
    pub async fn open(config: VitaeConfig) -> Result<Self> {
        let store = FsStore::open(&config.store.root, &config.store.signing_key)
            .await
            .with_context(|| format!("Failed to open store at {}", config.store.root.display()))?;
        let store = Arc::new(store);

        let user = User {
            id: config.user.id.clone(),
            email: config.user.email.clone(),
        };
        let identity: Arc<dyn Identity> = Arc::new(StaticIdentity::new(user.clone()));
        let backend = Backend::from_store(store.clone(), identity);

        Ok(Self {
            config,
            store,
            backend,
            user,
        })
    }

    /// Engine gateway; the typst engine starts on first use.
    pub fn compiler(&self) -> Arc<dyn Compiler> {
        let factory = TypstEngine::factory(self.config.engine.font_dirs.clone());
        Arc::new(CompilerGateway::new(
            factory,
            self.config.engine.init_timeout(),
        ))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::from(&self.config.session)
    }

    pub async fn project(&self, id: &str) -> Result<Project> {
        let id = ProjectId::from(id);
        self.backend
            .projects
            .get_project(&id)
            .await?
            .with_context(|| format!("project {id} not found"))
    }

    /// Fetch a project, failing unless the current user owns it.
    pub async fn owned_project(&self, id: &str) -> Result<Project> {
        let project = self.project(id).await?;
        if project.owner_id != self.user.id {
            bail!("only the owner of {} can do this", project.id);
        }
        Ok(project)
    }
}
