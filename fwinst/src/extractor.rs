//! An [`Extractor`] that delegates unpacking to an external program.
use anyhow::{Context, Result, bail};
use fwinst_core::launcher::Extractor;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Runs `<program> <root> <package>` and reads progress from its stdout.
///
/// Every stdout line that parses as an integer is taken as a completion
/// percentage. Other lines are logged and otherwise ignored. A non-zero exit
/// status fails the installation.
pub struct CommandExtractor {
    program: PathBuf,
}

impl CommandExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Parses a progress line such as `"42"` or `" 42%"`.
fn parse_percent(line: &str) -> Option<u32> {
    let trimmed = line.trim();
    trimmed
        .strip_suffix('%')
        .unwrap_or(trimmed)
        .trim_end()
        .parse()
        .ok()
}

/// Feeds every percentage line of `output` to `on_progress`. Lines need not
/// be valid UTF-8.
fn forward_progress(output: impl Read, on_progress: &mut dyn FnMut(u32)) -> io::Result<()> {
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        match parse_percent(&line) {
            Some(percent) => on_progress(percent),
            None => debug!(line = %line.trim_end(), "extractor output"),
        }
    }
}

impl Extractor for CommandExtractor {
    fn extract(
        &self,
        destination_root: &Path,
        source: &Path,
        on_progress: &mut dyn FnMut(u32),
    ) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(destination_root)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start extractor {}", self.program.display()))?;

        let forwarded = match child.stdout.take() {
            Some(stdout) => forward_progress(stdout, on_progress),
            None => Ok(()),
        };
        // The child must be reaped on every path, even when its output
        // could not be read.
        if forwarded.is_err()
            && let Err(e) = child.kill()
        {
            debug!(error = %e, "could not kill extractor");
        }
        let status = child.wait().context("failed to wait for extractor")?;
        forwarded.context("failed to read extractor output")?;

        if !status.success() {
            bail!("extractor exited with {status}");
        }
        Ok(())
    }
}
