//! The install session state machine.
//!
//! A session cycles through `Idle -> AwaitingSelection -> Installing ->
//! Completed -> Idle`. Every transition and every write to the session's
//! fields happens inside one critical section, so an observer polling with
//! [`InstallSession::snapshot`] sees either the state before a transition or
//! the state after it, never a mix of the two.
use crate::progress::Progress;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// The phase an install session is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingSelection,
    Installing,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingSelection => "awaiting a package selection",
            Phase::Installing => "installing",
            Phase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// The result of an installation, written once when the worker finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    /// The extraction failed. Carries a human-readable reason.
    Failure(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {operation} while the session is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },
    #[error("an installation is already in progress")]
    SessionBusy,
    #[error("no package path was provided")]
    EmptyPath,
    #[error("an installation cannot complete with a pending outcome")]
    PendingOutcome,
    #[error("package selection failed: {0}")]
    Selection(String),
    #[error("failed to launch the installation worker: {0}")]
    Launch(String),
}

/// A consistent copy of every session field, taken under the session lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub progress: u32,
    pub source_path: Option<PathBuf>,
    pub delete_source_on_finish: bool,
    pub result_version: String,
    pub outcome: Outcome,
}

/// What a session held when the observer acknowledged its completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acknowledgement {
    pub source_path: Option<PathBuf>,
    pub delete_source: bool,
    pub result_version: String,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: Phase,
    source_path: Option<PathBuf>,
    delete_source_on_finish: bool,
    result_version: String,
    outcome: Outcome,
}

impl SessionState {
    fn require(&self, phase: Phase, operation: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }
}

/// The single installation workflow shared by the worker and the observer.
///
/// Wrap it in an `Arc` and hand clones to whoever needs to drive or watch
/// the installation. Misuse (a transition from the wrong phase) is reported
/// as [`SessionError::InvalidState`] and leaves the session untouched.
#[derive(Debug, Default)]
pub struct InstallSession {
    state: Mutex<SessionState>,
    progress: Progress,
}

impl InstallSession {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the state consistent, so a panic while
    // holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new workflow: `Idle -> AwaitingSelection`.
    pub fn request_selection(&self) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.require(Phase::Idle, "request a package selection")?;
        state.phase = Phase::AwaitingSelection;
        Ok(())
    }

    /// Accepts the selected package: `AwaitingSelection -> Installing`.
    ///
    /// Fails with [`SessionError::SessionBusy`] while an installation is
    /// running and with [`SessionError::EmptyPath`] (staying in
    /// `AwaitingSelection`) for an empty path.
    pub fn confirm_selection(&self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let path = path.into();
        let mut state = self.lock();
        match state.phase {
            Phase::AwaitingSelection => {}
            Phase::Installing => return Err(SessionError::SessionBusy),
            phase => {
                return Err(SessionError::InvalidState {
                    operation: "confirm a package selection",
                    phase,
                });
            }
        }
        if path.as_os_str().is_empty() {
            return Err(SessionError::EmptyPath);
        }

        state.source_path = Some(path);
        state.phase = Phase::Installing;
        Ok(())
    }

    /// Abandons the selection: `AwaitingSelection -> Idle`.
    pub fn cancel_selection(&self) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.require(Phase::AwaitingSelection, "cancel a package selection")?;
        *state = SessionState::default();
        Ok(())
    }

    /// Returns to `Idle` if the session still awaits a selection, and reports
    /// whether it did. Any other phase is left alone.
    pub fn abandon_selection(&self) -> bool {
        let mut state = self.lock();
        if state.phase != Phase::AwaitingSelection {
            return false;
        }
        *state = SessionState::default();
        true
    }

    /// Records a progress report from the worker. Only accepted while
    /// installing; returns the percentage now in effect.
    pub fn report_progress(&self, percent: u32) -> Result<u32, SessionError> {
        let state = self.lock();
        state.require(Phase::Installing, "report progress")?;
        Ok(self.progress.report(percent))
    }

    /// Returns the current progress without taking the session lock.
    pub fn progress(&self) -> u32 {
        self.progress.read()
    }

    /// Publishes the result of the installation: `Installing -> Completed`.
    ///
    /// The phase, outcome and version become visible together.
    pub fn mark_completed(
        &self,
        outcome: Outcome,
        version: impl Into<String>,
    ) -> Result<(), SessionError> {
        if outcome == Outcome::Pending {
            return Err(SessionError::PendingOutcome);
        }
        let mut state = self.lock();
        state.require(Phase::Installing, "complete an installation")?;
        state.result_version = version.into();
        state.outcome = outcome;
        state.phase = Phase::Completed;
        Ok(())
    }

    /// Chooses whether the source package is deleted when the completion is
    /// acknowledged.
    pub fn set_delete_source_on_finish(&self, delete: bool) -> Result<(), SessionError> {
        let mut state = self.lock();
        if state.phase == Phase::Idle {
            return Err(SessionError::InvalidState {
                operation: "change the delete-on-finish setting",
                phase: Phase::Idle,
            });
        }
        state.delete_source_on_finish = delete;
        Ok(())
    }

    /// Resets a completed session: `Completed -> Idle`.
    ///
    /// Every field returns to its default and the progress drops to 0. The
    /// values the session held are handed back so the caller can act on
    /// them (for example, delete the source package).
    pub fn acknowledge(&self) -> Result<Acknowledgement, SessionError> {
        let mut state = self.lock();
        state.require(Phase::Completed, "acknowledge a completion")?;
        let previous = std::mem::take(&mut *state);
        self.progress.reset();

        Ok(Acknowledgement {
            source_path: previous.source_path,
            delete_source: previous.delete_source_on_finish,
            result_version: previous.result_version,
            outcome: previous.outcome,
        })
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Copies every field of the session under its lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            phase: state.phase,
            progress: self.progress.read(),
            source_path: state.source_path.clone(),
            delete_source_on_finish: state.delete_source_on_finish,
            result_version: state.result_version.clone(),
            outcome: state.outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installing(path: &str) -> InstallSession {
        let session = InstallSession::new();
        session.request_selection().unwrap();
        session.confirm_selection(path).unwrap();
        session
    }

    #[test]
    fn full_cycle_returns_to_idle() {
        let session = installing("/tmp/PS3UPDAT.PUP");
        assert_eq!(session.phase(), Phase::Installing);
        session.report_progress(55).unwrap();
        session.mark_completed(Outcome::Success, "3.65").unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, Phase::Completed);
        assert_eq!(snapshot.result_version, "3.65");
        assert_eq!(snapshot.outcome, Outcome::Success);

        let ack = session.acknowledge().unwrap();
        assert_eq!(ack.result_version, "3.65");
        assert_eq!(ack.source_path, Some(PathBuf::from("/tmp/PS3UPDAT.PUP")));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn confirm_selection_from_wrong_phase_leaves_fields_unchanged() {
        let session = InstallSession::new();
        let before = session.snapshot();
        assert_eq!(
            session.confirm_selection("/tmp/a.PUP"),
            Err(SessionError::InvalidState {
                operation: "confirm a package selection",
                phase: Phase::Idle,
            })
        );
        assert_eq!(session.snapshot(), before);

        let session = installing("/tmp/a.PUP");
        session.mark_completed(Outcome::Success, "").unwrap();
        let before = session.snapshot();
        assert!(matches!(
            session.confirm_selection("/tmp/b.PUP"),
            Err(SessionError::InvalidState {
                phase: Phase::Completed,
                ..
            })
        ));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn confirm_selection_while_installing_is_busy() {
        let session = installing("/tmp/a.PUP");
        session.report_progress(30).unwrap();
        assert_eq!(
            session.confirm_selection("/tmp/b.PUP"),
            Err(SessionError::SessionBusy)
        );
        let snapshot = session.snapshot();
        assert_eq!(snapshot.source_path, Some(PathBuf::from("/tmp/a.PUP")));
        assert_eq!(snapshot.progress, 30);
    }

    #[test]
    fn empty_path_is_rejected_and_selection_stays_open() {
        let session = InstallSession::new();
        session.request_selection().unwrap();
        assert_eq!(session.confirm_selection(""), Err(SessionError::EmptyPath));
        assert_eq!(session.phase(), Phase::AwaitingSelection);
    }

    #[test]
    fn cancel_selection_only_from_awaiting_selection() {
        let session = InstallSession::new();
        assert!(session.cancel_selection().is_err());
        session.request_selection().unwrap();
        session.cancel_selection().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.request_selection().is_ok());
    }

    #[test]
    fn abandon_selection_only_resets_an_open_selection() {
        let session = InstallSession::new();
        assert!(!session.abandon_selection());

        session.request_selection().unwrap();
        assert!(session.abandon_selection());
        assert_eq!(session.phase(), Phase::Idle);

        let session = installing("/tmp/a.PUP");
        assert!(!session.abandon_selection());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, Phase::Installing);
        assert_eq!(snapshot.source_path, Some(PathBuf::from("/tmp/a.PUP")));
    }

    #[test]
    fn request_selection_is_rejected_outside_idle() {
        let session = installing("/tmp/a.PUP");
        assert!(matches!(
            session.request_selection(),
            Err(SessionError::InvalidState {
                phase: Phase::Installing,
                ..
            })
        ));
    }

    #[test]
    fn progress_is_only_accepted_while_installing() {
        let session = InstallSession::new();
        assert!(session.report_progress(10).is_err());
        assert_eq!(session.progress(), 0);

        let session = installing("/tmp/a.PUP");
        assert_eq!(session.report_progress(60).unwrap(), 60);
        assert_eq!(session.report_progress(20).unwrap(), 60);
        session.mark_completed(Outcome::Success, "").unwrap();
        assert!(session.report_progress(100).is_err());
        assert_eq!(session.progress(), 60);
    }

    #[test]
    fn mark_completed_happens_once() {
        let session = installing("/tmp/a.PUP");
        assert_eq!(
            session.mark_completed(Outcome::Pending, "1.0"),
            Err(SessionError::PendingOutcome)
        );
        session
            .mark_completed(Outcome::Failure("bad header".into()), "")
            .unwrap();
        assert!(session.mark_completed(Outcome::Success, "3.65").is_err());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.outcome, Outcome::Failure("bad header".into()));
        assert_eq!(snapshot.result_version, "");
    }

    #[test]
    fn acknowledge_resets_every_field() {
        let session = installing("/tmp/a.PUP");
        session.set_delete_source_on_finish(true).unwrap();
        session.report_progress(100).unwrap();
        session.mark_completed(Outcome::Success, "3.65").unwrap();

        let ack = session.acknowledge().unwrap();
        assert!(ack.delete_source);

        session.request_selection().unwrap();
        session.confirm_selection("/tmp/b.PUP").unwrap();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.result_version, "");
        assert_eq!(snapshot.outcome, Outcome::Pending);
        assert!(!snapshot.delete_source_on_finish);
    }

    #[test]
    fn acknowledge_requires_completion() {
        let session = installing("/tmp/a.PUP");
        assert!(session.acknowledge().is_err());
        assert_eq!(session.phase(), Phase::Installing);
    }

    #[test]
    fn delete_flag_cannot_be_set_while_idle() {
        let session = InstallSession::new();
        assert!(session.set_delete_source_on_finish(true).is_err());
        assert!(!session.snapshot().delete_source_on_finish);
    }
}
