//! `vitae edit`: an interactive session over a working file.
//!
//! ```text
//! working .typ ──notify──► SourceWatcher ──edit──┐
//! stdin ─────────────────► Command ──────────────┼─► SessionHandle
//! Ctrl+C ────────────────► leave ────────────────┘        │
//!                                                         ▼
//!                          StatusRenderer ◄── watch<SessionView>
//!                          (page-N.svg, status block)
//! ```

mod command;
mod preview;
mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use self::command::{Command, HELP, parse_choice};
use self::preview::{PageWriter, StatusRenderer};
use self::watch::SourceWatcher;
use super::common::App;
use crate::core::shutdown_requested;
use crate::session::{
    self, LeaveOutcome, Phase, Resolution, ResolveOutcome, SaveOutcome, SessionError,
    SessionHandle, SkipReason,
};
use crate::logger::status_detach;
use crate::{debug, log};

pub async fn edit(app: &App, id: &str) -> Result<()> {
    let handle = session::open(
        id.into(),
        app.backend.clone(),
        app.compiler(),
        app.session_options(),
    )
    .await?;
    let view = handle.view();
    let permissions = view.permissions;

    let workdir = app.config.preview.output.join(id);
    tokio::fs::create_dir_all(&workdir)
        .await
        .with_context(|| format!("Failed to create {}", workdir.display()))?;
    let work_file = workdir.join("main.typ");
    write_work_file(&work_file, &view.buffer).await?;

    let mut watcher = SourceWatcher::spawn(&work_file)
        .with_context(|| format!("Failed to watch {}", work_file.display()))?;
    let mut lines = spawn_stdin_reader();
    let mut views = handle.subscribe();
    let mut renderer = StatusRenderer::new(PageWriter::new(workdir.clone()));

    log!(
        "edit";
        "{} ({}){}",
        view.title,
        work_file.display(),
        if permissions.can_edit { "" } else { " [read-only]" }
    );
    log!("edit"; "{}", HELP);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_requested() => {
                if leave(&handle, &mut lines).await? {
                    break;
                }
            }

            Some(text) = watcher.recv() => {
                if !permissions.can_edit {
                    debug!("edit"; "read-only, change to working file ignored");
                    continue;
                }
                if handle.edit(text).is_err() {
                    break;
                }
            }

            line = lines.recv() => {
                let Some(line) = line else {
                    // stdin closed: leave as if `:q` was typed, saving when dirty
                    leave_saving(&handle).await?;
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => {
                        if leave(&handle, &mut lines).await? {
                            break;
                        }
                    }
                    Ok(command) => run_command(app, id, &handle, &work_file, command).await?,
                    Err(e) => log!("edit"; "{}; {}", e, HELP),
                }
                status_detach();
            }

            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                renderer.update(&view)?;
                if view.phase == Phase::Closed {
                    break;
                }
            }
        }
    }

    log!("edit"; "closed {}", id);
    Ok(())
}

async fn run_command(
    app: &App,
    id: &str,
    handle: &SessionHandle,
    work_file: &Path,
    command: Command,
) -> Result<()> {
    match command {
        Command::Save => match handle.save().await {
            Ok(SaveOutcome::Saved(_)) | Ok(SaveOutcome::Conflict(_)) => {}
            Ok(SaveOutcome::Skipped(SkipReason::InProgress)) => {
                log!("save"; "a save is already running");
            }
            Ok(SaveOutcome::Skipped(reason)) => debug!("save"; "skipped: {:?}", reason),
            Err(SessionError::Save(e)) => log!("error"; "{}", e),
            Err(e) => return Err(e.into()),
        },
        Command::Export(path) => {
            let output = path.unwrap_or_else(|| app.config.preview.output.join(format!("{id}.pdf")));
            match handle.export_pdf().await {
                Ok(pdf) => {
                    tokio::fs::write(&output, &pdf)
                        .await
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    log!("export"; "{} ({} bytes)", output.display(), pdf.len());
                }
                Err(SessionError::Engine(e)) => log!("error"; "export failed: {}", e),
                Err(e) => return Err(e.into()),
            }
        }
        Command::Retry => match handle.retry_engine().await {
            Ok(()) => log!("edit"; "engine ready"),
            Err(SessionError::Engine(e)) => log!("error"; "{}", e),
            Err(e) => return Err(e.into()),
        },
        Command::Keep => resolve(handle, work_file, Resolution::KeepLocal).await?,
        Command::Reload => resolve(handle, work_file, Resolution::DiscardLocal).await?,
        Command::Help => log!("edit"; "{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

async fn resolve(handle: &SessionHandle, work_file: &Path, resolution: Resolution) -> Result<()> {
    match handle.resolve_conflict(resolution).await {
        Ok(ResolveOutcome::Reloaded) => {
            write_work_file(work_file, &handle.view().buffer).await?;
            log!("conflict"; "reloaded remote copy into {}", work_file.display());
        }
        Ok(ResolveOutcome::Overwrote(_)) => log!("conflict"; "remote copy overwritten"),
        Ok(ResolveOutcome::NoConflict) => log!("conflict"; "nothing to resolve"),
        Err(SessionError::Save(e)) => log!("error"; "{}", e),
        Err(SessionError::Load(e)) => log!("error"; "reload failed: {}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Leave, prompting for save/discard/cancel when dirty. Returns whether the
/// session closed.
async fn leave(handle: &SessionHandle, lines: &mut mpsc::UnboundedReceiver<String>) -> Result<bool> {
    let outcome = match handle.leave().await? {
        LeaveOutcome::NeedsDecision => {
            status_detach();
            log!("edit"; "unsaved changes: [s]ave, [d]iscard or [c]ancel?");
            let choice = lines.recv().await.map_or_else(|| parse_choice("s"), |l| parse_choice(&l));
            handle.leave_with(choice).await?
        }
        outcome => outcome,
    };
    Ok(report_leave(outcome))
}

async fn leave_saving(handle: &SessionHandle) -> Result<()> {
    let outcome = match handle.leave().await? {
        LeaveOutcome::NeedsDecision => handle.leave_with(session::LeaveChoice::Save).await?,
        outcome => outcome,
    };
    report_leave(outcome);
    Ok(())
}

fn report_leave(outcome: LeaveOutcome) -> bool {
    match outcome {
        LeaveOutcome::Left => true,
        LeaveOutcome::NeedsDecision | LeaveOutcome::Stayed => false,
        LeaveOutcome::SaveFailed(e) => {
            log!("error"; "{}; still editing", e);
            false
        }
        LeaveOutcome::Conflict(_) => {
            log!("conflict"; "resolve with :keep or :reload before leaving");
            false
        }
    }
}

async fn write_work_file(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Forward stdin lines from a blocking thread.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.trim_end().to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}
