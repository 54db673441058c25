//! The core, UI-agnostic library for the `fwinst` firmware installer.
//!
//! `fwinst-core` is designed to be used as a library by any front-end, whether it's
//! a command-line interface (like `fwinst`) or a graphical user interface. It
//! runs a single firmware installation at a time on a background worker and
//! exposes its progress and final result through a shared session that the
//! front-end polls on its own schedule.
//!
//! The library is structured into several key modules:
//! - [`session`]: The install session state machine shared by worker and observer.
//! - [`progress`]: The lock-free, monotonically increasing progress value.
//! - [`launcher`]: Selection handling and the detached installation worker, plus
//!   the [`launcher::Extractor`] and [`launcher::SelectionProvider`] seams.
//! - [`finalize`]: Post-extraction version lookup and staging cleanup.
//! - [`layout`]: Where things live below the destination root.
//! - [`package`]: Decompression of compressed source packages.
//!
//! Package extraction itself is not implemented here; front-ends supply an
//! [`launcher::Extractor`] that reports its progress via a callback.
//!
//! ## Example: Installing a Package and Polling for the Result
//!
//! ```rust,no_run
//! use fwinst_core::launcher::{Extractor, Installer};
//! use fwinst_core::layout::InstallLayout;
//! use fwinst_core::session::{Outcome, Phase};
//! use std::path::Path;
//! use std::time::Duration;
//! use anyhow::Result;
//!
//! struct MyExtractor;
//!
//! impl Extractor for MyExtractor {
//!     fn extract(&self, root: &Path, source: &Path, on_progress: &mut dyn FnMut(u32)) -> Result<()> {
//!         // Unpack `source` into `root`, calling `on_progress` along the way.
//!         on_progress(100);
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let installer = Installer::new(InstallLayout::new("/path/to/root"), MyExtractor);
//!
//!     installer.session().request_selection()?;
//!     installer.confirm_selection("/path/to/PSP2UPDAT.PUP")?;
//!
//!     // The worker runs on its own thread; watch it through the session.
//!     loop {
//!         let snapshot = installer.session().snapshot();
//!         if snapshot.phase == Phase::Completed {
//!             match snapshot.outcome {
//!                 Outcome::Success => println!("Installed firmware {}", snapshot.result_version),
//!                 Outcome::Failure(reason) => println!("Installation failed: {reason}"),
//!                 Outcome::Pending => unreachable!(),
//!             }
//!             break;
//!         }
//!         println!("{}% done", snapshot.progress);
//!         std::thread::sleep(Duration::from_millis(100));
//!     }
//!
//!     installer.acknowledge()?;
//!     Ok(())
//! }
//! ```

pub mod finalize;
pub mod launcher;
pub mod layout;
pub mod package;
pub mod progress;
pub mod session;
