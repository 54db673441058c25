//! Package selection for the command line.
use dialoguer::{Input, theme::ColorfulTheme};
use fwinst_core::launcher::{Selection, SelectionProvider};
use fwinst_core::package;
use std::path::{Path, PathBuf};

fn check_package(path: &Path, filter: &str) -> Selection {
    if !path.is_file() {
        return Selection::Failed(format!("{} is not a file", path.display()));
    }
    if !package::matches_filter(path, filter) {
        return Selection::Failed(format!(
            "{} is not a .{filter} package",
            path.display()
        ));
    }
    Selection::Chosen(path.to_path_buf())
}

/// Uses a package path given on the command line.
pub struct ArgumentSelection {
    path: PathBuf,
}

impl ArgumentSelection {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SelectionProvider for ArgumentSelection {
    fn choose_file(&self, filter: &str) -> Selection {
        check_package(&self.path, filter)
    }
}

/// Prompts for a package path. An empty answer cancels the selection.
pub struct PromptSelection;

impl SelectionProvider for PromptSelection {
    fn choose_file(&self, filter: &str) -> Selection {
        let answer = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Path to the .{filter} package (leave empty to cancel)"))
            .allow_empty(true)
            .interact_text();

        match answer {
            Ok(answer) if answer.trim().is_empty() => Selection::Cancelled,
            Ok(answer) => check_package(Path::new(answer.trim()), filter),
            Err(e) => Selection::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_selection_checks_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("PSP2UPDAT.PUP");
        std::fs::write(&package, b"pup").unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"hi").unwrap();

        assert_eq!(
            ArgumentSelection::new(package.clone()).choose_file("PUP"),
            Selection::Chosen(package)
        );
        assert!(matches!(
            ArgumentSelection::new(notes).choose_file("PUP"),
            Selection::Failed(_)
        ));
        assert!(matches!(
            ArgumentSelection::new(dir.path().join("missing.PUP")).choose_file("PUP"),
            Selection::Failed(_)
        ));
    }
}
