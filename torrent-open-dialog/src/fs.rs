use std::path::Path;

/// Minimal file metadata needed to vet a candidate before reading it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FsMetadata {
    /// Whether the path refers to a directory.
    pub is_dir: bool,
    /// File size in bytes.
    pub len: u64,
}

/// File system abstraction used by the selection validator.
///
/// Implementations must be shareable with a background validation thread.
pub trait FileSystem: Send + Sync {
    /// Fetch minimal metadata for a path (follows symlinks).
    fn metadata(&self, path: &Path) -> std::io::Result<FsMetadata>;
    /// Read the whole file into memory.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Default filesystem implementation using `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn metadata(&self, path: &Path) -> std::io::Result<FsMetadata> {
        let md = std::fs::metadata(path)?;
        Ok(FsMetadata {
            is_dir: md.is_dir(),
            len: md.len(),
        })
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
