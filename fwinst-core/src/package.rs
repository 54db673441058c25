//! Prepares a source package for extraction.
//!
//! Packages may be distributed compressed (`.gz`, `.xz`, `.zst`). Those are
//! decompressed to a temporary file first, so the extractor always receives
//! the raw package.
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;
use xz2::read::XzDecoder;
use zstd::stream::read::Decoder as ZstdDecoder;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Compression {
    Gzip,
    Xz,
    Zstd,
}

fn compression_of(path: &Path) -> Option<Compression> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "gz" | "gzip" => Some(Compression::Gzip),
        "xz" => Some(Compression::Xz),
        "zst" | "zstd" => Some(Compression::Zstd),
        _ => None,
    }
}

/// Returns `true` if the package will be decompressed before extraction.
pub fn is_compressed(path: &Path) -> bool {
    compression_of(path).is_some()
}

/// Checks a package's extension against a selection filter such as `"PUP"`.
///
/// A compression suffix is looked through, so `PS3UPDAT.PUP.xz` matches.
pub fn matches_filter(path: &Path, filter: &str) -> bool {
    let inner = if is_compressed(path) {
        path.file_stem().map(Path::new)
    } else {
        Some(path)
    };

    inner
        .and_then(Path::extension)
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(filter))
}

/// A package ready to be handed to an extractor.
///
/// If the source was decompressed to a temporary file, that file is deleted
/// when this value is dropped.
pub struct PreparedPackage {
    path: PathBuf,
    _temp_handle: Option<TempPath>,
}

impl AsRef<Path> for PreparedPackage {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Decompresses `source` to a temporary file if necessary.
pub fn prepare(source: &Path) -> io::Result<PreparedPackage> {
    let Some(compression) = compression_of(source) else {
        return Ok(PreparedPackage {
            path: source.to_path_buf(),
            _temp_handle: None,
        });
    };

    let input = BufReader::new(File::open(source)?);
    let mut reader: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(input)),
        Compression::Xz => Box::new(XzDecoder::new(input)),
        Compression::Zstd => Box::new(ZstdDecoder::new(input)?),
    };

    let mut temp_file = NamedTempFile::new()?;
    let total = {
        let mut writer = BufWriter::new(&mut temp_file);
        let total = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        total
    };
    debug!(source = %source.display(), ?compression, bytes = total, "decompressed package");

    let temp_path = temp_file.into_temp_path();
    Ok(PreparedPackage {
        path: temp_path.to_path_buf(),
        _temp_handle: Some(temp_path),
    })
}
