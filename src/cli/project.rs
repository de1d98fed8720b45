//! One-shot project commands: new, export, share, role, link, rm.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;

use super::common::App;
use crate::embed::typst::{RESUME_TYP, ResumeVars};
use crate::log;
use crate::session;
use crate::store::{ProjectId, Role, SaveOptions, Share, ShareAccess};

/// Create a project owned by the current user, seeded from the template.
pub async fn new_project(app: &App, title: &str, kind: &str) -> Result<ProjectId> {
    if title.trim().is_empty() {
        bail!("title must not be empty");
    }

    let project = app
        .backend
        .projects
        .create_project(&app.user, title, kind)
        .await
        .context("Failed to create project")?;

    let source = RESUME_TYP.render(&ResumeVars {
        title,
        name: &app.user.id,
        email: &app.user.email,
    });
    app.backend
        .files
        .save_file(&project.typ_path, source.as_bytes(), SaveOptions::default())
        .await
        .with_context(|| format!("Failed to write {}", project.typ_path))?;

    log!("new"; "created {} ({})", project.title, project.id);
    println!("{}", project.id);
    Ok(project.id)
}

/// Compile a project for publishing and write the PDF to `output`.
pub async fn export(app: &App, id: &str, output: Option<&Path>) -> Result<PathBuf> {
    let handle = session::open(
        ProjectId::from(id),
        app.backend.clone(),
        app.compiler(),
        app.session_options(),
    )
    .await?;

    let result = handle.export_pdf().await;
    handle.leave().await?;
    let pdf = result.context("Export failed")?;

    let output = output.map_or_else(|| PathBuf::from(format!("{id}.pdf")), Path::to_path_buf);
    tokio::fs::write(&output, &pdf)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log!("export"; "{} ({} bytes)", output.display(), pdf.len());
    Ok(output)
}

pub async fn share(app: &App, id: &str, user_id: &str, edit: bool) -> Result<()> {
    let project = app.owned_project(id).await?;
    if user_id == project.owner_id {
        bail!("{user_id} already owns {}", project.id);
    }

    let access = if edit {
        ShareAccess::Edit
    } else {
        ShareAccess::Read
    };
    app.backend
        .shares
        .create_share(Share {
            project_id: project.id.clone(),
            user_id: user_id.to_string(),
            access,
        })
        .await?;

    log!("share"; "{} can now {} {}", user_id, if edit { "edit" } else { "read" }, project.title);
    Ok(())
}

pub async fn set_role(app: &App, email: &str, role: Role) -> Result<()> {
    app.backend.shares.set_role(email, role).await?;
    log!("role"; "{} is now {:?}", email, role);
    Ok(())
}

/// Print a signed URL for the project's PDF, or check one with `verify`.
pub async fn link(app: &App, id: &str, ttl: Option<u64>, verify: Option<&str>) -> Result<()> {
    if let Some(url) = verify {
        if app.store.verify_signed_url(url, Utc::now().timestamp()) {
            log!("link"; "valid");
            return Ok(());
        }
        bail!("link is invalid or expired");
    }

    let project = app.project(id).await?;
    let ttl = ttl.map_or_else(|| app.config.store.signed_url_ttl(), Duration::from_secs);
    let url = app
        .backend
        .files
        .create_signed_url(&project.pdf_path(), ttl)
        .await
        .with_context(|| format!("No PDF stored for {}; save it in `vitae edit` first", project.id))?;

    println!("{url}");
    Ok(())
}

/// Delete a project's files and record. Only the owner may do this.
pub async fn remove(app: &App, id: &str) -> Result<()> {
    let project = app.owned_project(id).await?;

    let files = &app.backend.files;
    let mut paths = vec![project.typ_path.clone(), project.pdf_path()];
    paths.extend(project.thumbnail_path.clone());
    for path in &paths {
        files
            .delete_file(path)
            .await
            .with_context(|| format!("Failed to delete {path}"))?;
    }

    app.backend.projects.delete_project(&project.id).await?;
    log!("rm"; "deleted {} ({})", project.title, project.id);
    Ok(())
}
