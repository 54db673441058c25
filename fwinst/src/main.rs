mod extractor;
mod select;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use extractor::CommandExtractor;
use fwinst_core::launcher::Installer;
use fwinst_core::layout::{FONT_PACKAGE_URL, InstallLayout};
use fwinst_core::progress::MAX_PERCENT;
use fwinst_core::session::{Acknowledgement, InstallSession, Outcome, Phase, SessionSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use select::{ArgumentSelection, PromptSelection};
use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// How often the observer looks at the session while a worker runs.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "fwinst")]
#[command(about = "A safe, interactive firmware package installer", version)]
struct Cli {
    /// Log installation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a firmware package
    Install {
        /// Firmware package to install (prompts when omitted)
        package: Option<PathBuf>,

        /// Directory to install the firmware into
        #[arg(short, long, env = "FWINST_ROOT")]
        root: PathBuf,

        /// Program that unpacks the package, invoked as `<program> <root> <package>`
        #[arg(short, long, env = "FWINST_EXTRACTOR")]
        extractor: PathBuf,

        /// Delete the package once the installation succeeds
        #[arg(short = 'd', long = "delete-package")]
        delete_package: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Polls the session until the worker has published its result, mirroring
/// the progress on a bar.
fn watch(session: &InstallSession) -> Result<SessionSnapshot> {
    let pb = ProgressBar::new(MAX_PERCENT.into());
    pb.set_prefix("Installing");
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:12} [{elapsed_precise}] [{bar:40.green/black}] {pos:>3}% {msg}")?
            .progress_chars("■ "),
    );

    loop {
        let snapshot = session.snapshot();
        pb.set_position(snapshot.progress.into());

        if snapshot.phase == Phase::Completed {
            match &snapshot.outcome {
                Outcome::Failure(_) => pb.abandon_with_message("❌ Installation failed."),
                _ => pb.finish_with_message("Installation complete."),
            }
            return Ok(snapshot);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Asks whether the package should be removed now that it is installed.
fn confirm_delete(package: Option<&PathBuf>) -> Result<bool> {
    let Some(package) = package else {
        return Ok(false);
    };
    if !stdout().is_terminal() {
        return Ok(false);
    }

    let confirmation = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Delete {}?", package.display()))
        .default(false)
        .interact()?;

    Ok(confirmation)
}

/// The source package, if acknowledging the installation deleted it.
fn removed_source(ack: &Acknowledgement) -> Option<&Path> {
    match ack.source_path.as_deref() {
        Some(source) if ack.delete_source && !source.exists() => Some(source),
        _ => None,
    }
}

fn install(
    package: Option<PathBuf>,
    root: PathBuf,
    extractor: PathBuf,
    delete_package: bool,
) -> Result<()> {
    let installer = Installer::new(InstallLayout::new(root), CommandExtractor::new(extractor));

    let started = match package {
        Some(path) => installer.select(&ArgumentSelection::new(path))?,
        None => installer.select(&PromptSelection)?,
    };
    if !started {
        println!("Installation cancelled.");
        return Ok(());
    }

    if let Some(source) = installer.session().snapshot().source_path {
        println!("  Package: {}", style(source.display()).cyan());
    }
    println!("  Root:    {}", style(installer.layout().root().display()).cyan());
    println!();

    let snapshot = watch(installer.session())?;

    if snapshot.outcome == Outcome::Success {
        println!("\n✨ Firmware installed successfully.");
        if !snapshot.result_version.is_empty() {
            println!("  Version: {}", style(&snapshot.result_version).cyan());
        }

        if installer.layout().font_package_missing() {
            println!(
                "\n{} No firmware font package is installed. Some text may not display correctly.",
                style("NOTE:").yellow().bold(),
            );
            println!("  Download it from {}", style(FONT_PACKAGE_URL).cyan());
        }

        let delete = delete_package || confirm_delete(snapshot.source_path.as_ref())?;
        installer.set_delete_source_on_finish(delete)?;
    }

    let ack = installer.acknowledge()?;
    if let Some(source) = removed_source(&ack) {
        println!("Removed {}.", style(source.display()).cyan());
    }

    match ack.outcome {
        Outcome::Failure(reason) => Err(anyhow!("Firmware installation failed: {reason}")),
        _ => Ok(()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Install {
            package,
            root,
            extractor,
            delete_package,
        } => install(package, root, extractor, delete_package)?,
    }

    Ok(())
}
