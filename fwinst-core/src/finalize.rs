//! Post-extraction work: read the installed version, clean up staging data
//! and publish the result to the session.
use crate::layout::InstallLayout;
use crate::session::{InstallSession, Outcome, SessionError};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Reads the first line of the version descriptor at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_version(path: &Path) -> io::Result<Option<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    let version = line.trim_end_matches(['\r', '\n']).to_string();
    Ok(Some(version))
}

/// Recursively removes the staging directory. An absent directory is not an
/// error.
pub fn remove_staging(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Finishes an installation and moves the session to `Completed`.
///
/// A missing version descriptor or a failed cleanup is logged and does not
/// change the outcome; only the extraction result does.
pub fn finalize(
    session: &InstallSession,
    layout: &InstallLayout,
    extraction: anyhow::Result<()>,
) -> Result<(), SessionError> {
    let version_file = layout.version_file();
    let version = match read_version(&version_file) {
        Ok(Some(version)) => version,
        Ok(None) => {
            warn!(path = %version_file.display(), "firmware version file not found");
            String::new()
        }
        Err(e) => {
            warn!(path = %version_file.display(), error = %e, "could not read firmware version file");
            String::new()
        }
    };

    let staging = layout.staging_dir();
    if let Err(e) = remove_staging(&staging) {
        warn!(path = %staging.display(), error = %e, "could not remove staging directory");
    }

    let outcome = match extraction {
        Ok(()) => {
            info!(version = %version, "firmware installation finished");
            Outcome::Success
        }
        Err(e) => {
            let reason = format!("{e:#}");
            warn!(reason = %reason, "firmware installation failed");
            Outcome::Failure(reason)
        }
    };

    session.mark_completed(outcome, version)
}
