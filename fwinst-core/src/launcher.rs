//! Launches the background worker that installs a selected package.
//!
//! The [`Installer`] owns the shared [`InstallSession`] and the two external
//! collaborators it needs: a [`SelectionProvider`] that asks the user for a
//! package, and an [`Extractor`] that unpacks it. Once a selection is
//! confirmed, a detached worker thread runs extraction and finalization; the
//! caller learns about progress and completion only by polling the session.
use crate::finalize;
use crate::layout::{InstallLayout, PACKAGE_FILTER};
use crate::package;
use crate::progress::MAX_PERCENT;
use crate::session::{Acknowledgement, InstallSession, Outcome, SessionError};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Unpacks a firmware package below a destination root.
///
/// Implementations call `on_progress` with percentages in `0..=100` as they
/// go. Returning an error marks the installation as failed.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        destination_root: &Path,
        source: &Path,
        on_progress: &mut dyn FnMut(u32),
    ) -> Result<()>;
}

/// The answer of a file selection dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Chosen(PathBuf),
    Cancelled,
    Failed(String),
}

/// Asks the user to pick a package file.
pub trait SelectionProvider {
    /// Offers files matching `filter` (an extension such as `"PUP"`).
    fn choose_file(&self, filter: &str) -> Selection;
}

/// Drives one installation at a time against a shared session.
pub struct Installer {
    session: Arc<InstallSession>,
    layout: InstallLayout,
    extractor: Arc<dyn Extractor>,
}

impl Installer {
    pub fn new(layout: InstallLayout, extractor: impl Extractor + 'static) -> Self {
        Self {
            session: Arc::new(InstallSession::new()),
            layout,
            extractor: Arc::new(extractor),
        }
    }

    /// The session observers should poll.
    pub fn session(&self) -> &Arc<InstallSession> {
        &self.session
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Runs a package selection and, if a package is chosen, launches the
    /// installation.
    ///
    /// Returns `Ok(true)` once a worker is running and `Ok(false)` if the user
    /// cancelled. A failed dialog is logged and reported as
    /// [`SessionError::Selection`]. In both of those cases the session is back
    /// at `Idle` and no worker was started.
    pub fn select(&self, provider: &dyn SelectionProvider) -> Result<bool, SessionError> {
        self.session.request_selection()?;

        match provider.choose_file(PACKAGE_FILTER) {
            Selection::Chosen(path) => match self.confirm_selection(path) {
                Ok(()) => Ok(true),
                Err(e) => {
                    self.session.abandon_selection();
                    Err(e)
                }
            },
            Selection::Cancelled => {
                self.session.abandon_selection();
                info!("package selection cancelled");
                Ok(false)
            }
            Selection::Failed(message) => {
                self.session.abandon_selection();
                error!(error = %message, "error initializing file dialog");
                Err(SessionError::Selection(message))
            }
        }
    }

    /// Confirms `path` as the package to install and starts the worker.
    ///
    /// Returns as soon as the worker is scheduled. Only valid while the
    /// session awaits a selection; fails with [`SessionError::SessionBusy`]
    /// while another installation runs.
    pub fn confirm_selection(&self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let path = path.into();
        self.session.confirm_selection(path.clone())?;
        self.launch(path)
    }

    fn launch(&self, source: PathBuf) -> Result<(), SessionError> {
        let worker = {
            let session = Arc::clone(&self.session);
            let layout = self.layout.clone();
            let extractor = Arc::clone(&self.extractor);
            move || run_worker(&session, &layout, extractor.as_ref(), &source)
        };

        match thread::Builder::new()
            .name("firmware-install".to_string())
            .spawn(worker)
        {
            // The worker is detached; its result reaches the observer through
            // the session.
            Ok(_) => Ok(()),
            Err(e) => {
                let reason = e.to_string();
                error!(error = %reason, "could not spawn installation worker");
                self.session
                    .mark_completed(Outcome::Failure(reason.clone()), String::new())?;
                Err(SessionError::Launch(reason))
            }
        }
    }

    /// Chooses whether the source package is deleted on acknowledgement.
    pub fn set_delete_source_on_finish(&self, delete: bool) -> Result<(), SessionError> {
        self.session.set_delete_source_on_finish(delete)
    }

    /// Dismisses a completed installation and resets the session to `Idle`.
    ///
    /// If deleting the source was requested, the package file is removed now.
    pub fn acknowledge(&self) -> Result<Acknowledgement, SessionError> {
        let ack = self.session.acknowledge()?;

        if let (true, Some(source)) = (ack.delete_source, ack.source_path.as_deref()) {
            match fs::remove_file(source) {
                Ok(()) => info!(path = %source.display(), "deleted source package"),
                Err(e) => warn!(path = %source.display(), error = %e, "could not delete source package"),
            }
        }

        Ok(ack)
    }
}

fn run_worker(
    session: &InstallSession,
    layout: &InstallLayout,
    extractor: &dyn Extractor,
    source: &Path,
) {
    info!(source = %source.display(), root = %layout.root().display(), "installing firmware package");
    let extraction = extract_package(session, layout, extractor, source);

    if let Err(e) = finalize::finalize(session, layout, extraction) {
        error!(error = %e, "could not publish installation result");
    }
}

fn extract_package(
    session: &InstallSession,
    layout: &InstallLayout,
    extractor: &dyn Extractor,
    source: &Path,
) -> Result<()> {
    let package = package::prepare(source)
        .with_context(|| format!("failed to prepare package {}", source.display()))?;

    let mut on_progress = |percent: u32| {
        if let Err(e) = session.report_progress(percent) {
            debug!(error = %e, percent, "dropped progress report");
        }
    };

    extractor
        .extract(layout.root(), package.as_ref(), &mut on_progress)
        .with_context(|| format!("failed to extract {}", source.display()))?;

    on_progress(MAX_PERCENT);
    Ok(())
}
