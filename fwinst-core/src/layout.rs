//! On-disk locations under an installation's destination root.
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the directory the extractor unpacks into, relative to the root.
pub const STAGING_DIR: &str = "PUP_DEC";
/// Location of the version descriptor, relative to the staging directory.
pub const VERSION_FILE: &str = "PUP/version.txt";
/// Directory that holds the separately distributed firmware font package.
pub const FONT_PACKAGE_DIR: &str = "sa0";
/// Where users can fetch the font package when it is missing.
pub const FONT_PACKAGE_URL: &str = "https://bit.ly/2P2rb0r";
/// File type offered by the package selection dialog.
pub const PACKAGE_FILTER: &str = "PUP";

/// Resolves the fixed layout of an installation below a destination root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn version_file(&self) -> PathBuf {
        self.staging_dir().join(VERSION_FILE)
    }

    pub fn font_package_dir(&self) -> PathBuf {
        self.root.join(FONT_PACKAGE_DIR)
    }

    /// Returns `true` if the font package directory is absent or empty.
    pub fn font_package_missing(&self) -> bool {
        match fs::read_dir(self.font_package_dir()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        let layout = InstallLayout::new("/data/vita");
        assert_eq!(layout.staging_dir(), Path::new("/data/vita/PUP_DEC"));
        assert_eq!(
            layout.version_file(),
            Path::new("/data/vita/PUP_DEC/PUP/version.txt")
        );
        assert_eq!(layout.font_package_dir(), Path::new("/data/vita/sa0"));
    }

    #[test]
    fn font_package_missing_when_absent_or_empty() {
        let root = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(root.path());
        assert!(layout.font_package_missing());

        fs::create_dir(layout.font_package_dir()).unwrap();
        assert!(layout.font_package_missing());

        fs::write(layout.font_package_dir().join("font.pvf"), b"font").unwrap();
        assert!(!layout.font_package_missing());
    }
}
