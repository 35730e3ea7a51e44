use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::dialog_core::TorrentDialogCore;
use crate::fs::StdFileSystem;
use crate::metainfo::BencodeMetainfoParser;
use crate::validator::{ConfirmHandler, SelectionValidator};

/// Dialog mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogMode {
    /// Pick a single torrent file
    OpenFile,
    /// Pick multiple torrent files
    OpenFiles,
}

/// File filter (e.g., "Torrent files" -> ["torrent"]).
///
/// Extensions are matched case-insensitively and should be provided without a
/// leading dot. The variants created from tuples will be normalized to
/// lowercase automatically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Filter display name
    pub name: String,
    /// Lower-case extensions without dot (e.g., "torrent")
    pub extensions: Vec<String>,
}

impl FileFilter {
    /// Create a filter from a name and extensions.
    pub fn new(name: impl Into<String>, exts: impl Into<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            extensions: exts.into(),
        }
    }

    /// The filter every torrent dialog starts with.
    pub fn torrents() -> Self {
        Self::new("Torrent files", vec!["torrent".to_string()])
    }
}

impl From<(&str, &[&str])> for FileFilter {
    fn from(value: (&str, &[&str])) -> Self {
        Self {
            name: value.0.to_owned(),
            extensions: value.1.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

/// Selection result containing one or more accepted torrent paths
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Accepted filesystem paths, in the order the user selected them
    pub paths: Vec<PathBuf>,
}

/// Errors returned by the torrent dialog
#[derive(Error, Debug)]
pub enum FileDialogError {
    /// User cancelled the dialog
    #[error("cancelled")]
    Cancelled,
    /// Requested operation unsupported by the chosen backend
    #[error("unsupported operation for backend")]
    Unsupported,
    /// User gave up while a rejection message was on screen; carries that message
    #[error("validation blocked: {0}")]
    ValidationBlocked(String),
    /// Platform-specific error or general failure
    #[error("internal error: {0}")]
    Internal(String),
}

/// How a confirm attempt with both valid and invalid torrents is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MixedSelectionPolicy {
    /// Forward the valid subset and drop the rest.
    #[default]
    BestEffort,
    /// Keep the dialog open if any selected file is invalid.
    RejectAll,
}

/// Validation limits applied to every candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmPolicy {
    /// Resolution for mixed valid/invalid selections.
    pub mixed: MixedSelectionPolicy,
    /// Files larger than this are rejected without being read (`None` = no limit).
    pub max_file_size: Option<u64>,
}

impl ConfirmPolicy {
    /// Default upper bound for a metainfo file.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            mixed: MixedSelectionPolicy::BestEffort,
            max_file_size: Some(Self::DEFAULT_MAX_FILE_SIZE),
        }
    }
}

/// Where confirm attempts are validated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Validate on the caller thread; the confirm call blocks until decided.
    #[default]
    Sync,
    /// Validate on a worker thread and pick up the decision with
    /// [`TorrentDialogCore::poll_validation`].
    Background,
}

/// Builder for launching torrent open dialogs
#[derive(Clone, Debug)]
pub struct OpenTorrentDialog {
    pub(crate) mode: DialogMode,
    pub(crate) title: Option<String>,
    pub(crate) start_dir: Option<PathBuf>,
    pub(crate) filters: Vec<FileFilter>,
    pub(crate) policy: ConfirmPolicy,
    pub(crate) validation: ValidationPolicy,
}

impl Default for OpenTorrentDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenTorrentDialog {
    /// Create a new multi-select builder with the torrent filter installed.
    pub fn new() -> Self {
        Self {
            mode: DialogMode::OpenFiles,
            title: None,
            start_dir: None,
            filters: vec![FileFilter::torrents()],
            policy: ConfirmPolicy::default(),
            validation: ValidationPolicy::default(),
        }
    }

    /// Set the window title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
    /// Set initial directory
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }
    /// Allow multi selection (on by default)
    pub fn multi_select(mut self, yes: bool) -> Self {
        self.mode = if yes {
            DialogMode::OpenFiles
        } else {
            DialogMode::OpenFile
        };
        self
    }
    /// Add a filter in addition to the torrent filter.
    ///
    /// Examples
    /// ```
    /// use torrent_open_dialog::OpenTorrentDialog;
    /// let d = OpenTorrentDialog::new()
    ///     .filter(("All files", &["*"][..]))
    ///     .multi_select(false);
    /// ```
    pub fn filter<F: Into<FileFilter>>(mut self, filter: F) -> Self {
        self.filters.push(filter.into());
        self
    }
    /// Configure how candidates are judged.
    pub fn policy(mut self, policy: ConfirmPolicy) -> Self {
        self.policy = policy;
        self
    }
    /// Choose where validation runs.
    pub fn validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    /// The confirm handler this builder installs: a [`SelectionValidator`]
    /// over the real filesystem and the bencode parser.
    pub fn validator(&self) -> SelectionValidator<StdFileSystem, BencodeMetainfoParser> {
        SelectionValidator::new(StdFileSystem, BencodeMetainfoParser).with_policy(self.policy)
    }

    /// Build a UI-free dialog core for an in-app host.
    pub fn build_core(&self) -> TorrentDialogCore {
        self.build_core_with_handler(Arc::new(self.validator()))
    }

    /// Build a dialog core with a custom confirm handler.
    pub fn build_core_with_handler(
        &self,
        handler: Arc<dyn ConfirmHandler + Send + Sync>,
    ) -> TorrentDialogCore {
        let mut core = TorrentDialogCore::new(self.mode, handler);
        if let Some(dir) = &self.start_dir {
            core.cwd = dir.clone();
        }
        core.filters = self.filters.clone();
        core.validation = self.validation;
        core
    }
}

// Default stub when native feature is disabled
#[cfg(not(feature = "native-rfd"))]
impl OpenTorrentDialog {
    /// Open a dialog synchronously (blocking). Unsupported without `native-rfd`.
    pub fn open_blocking(self) -> Result<Selection, FileDialogError> {
        Err(FileDialogError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_starts_with_torrent_filter_and_multi_select() {
        let d = OpenTorrentDialog::new();
        assert_eq!(d.mode, DialogMode::OpenFiles);
        assert_eq!(d.filters, vec![FileFilter::torrents()]);
        assert_eq!(d.policy, ConfirmPolicy::default());
    }

    #[test]
    fn tuple_filter_lowercases_extensions() {
        let f = FileFilter::from(("Torrents", &["TORRENT", "Torrent"][..]));
        assert_eq!(f.extensions, vec!["torrent", "torrent"]);
    }

    #[test]
    fn build_core_carries_builder_configuration() {
        let core = OpenTorrentDialog::new()
            .multi_select(false)
            .directory("/downloads")
            .validation(ValidationPolicy::Background)
            .build_core();
        assert_eq!(core.mode, DialogMode::OpenFile);
        assert_eq!(core.cwd, PathBuf::from("/downloads"));
        assert_eq!(core.validation, ValidationPolicy::Background);
        assert!(core.is_idle());
    }
}
