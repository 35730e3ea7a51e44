use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use thiserror::Error;

use crate::core::{ConfirmPolicy, MixedSelectionPolicy};
use crate::fs::FileSystem;
use crate::metainfo::{MetainfoParser, TorrentSummary};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// One path the user had selected when confirming.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SelectionCandidate(PathBuf);

impl SelectionCandidate {
    /// Path of the selected file.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Non-empty, ordered, read-only set of candidates for one confirm attempt.
///
/// Duplicate paths collapse onto their first occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<SelectionCandidate>,
}

impl CandidateSet {
    /// Snapshot a selection. Returns `None` for an empty selection, which must
    /// never trigger validation.
    pub fn new<I, P>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let unique: IndexSet<PathBuf> = paths.into_iter().map(Into::into).collect();
        if unique.is_empty() {
            return None;
        }
        Some(Self {
            candidates: unique.into_iter().map(SelectionCandidate).collect(),
        })
    }

    /// Candidates in selection order.
    pub fn iter(&self) -> std::slice::Iter<'_, SelectionCandidate> {
        self.candidates.iter()
    }

    /// Number of candidates (always at least one).
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a SelectionCandidate;
    type IntoIter = std::slice::Iter<'a, SelectionCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Why a single candidate was excluded.
///
/// The display string is the short, user-facing reason; `detail` keeps the
/// underlying diagnostic for logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateError {
    /// Bytes were read but are not a torrent descriptor.
    #[error("not a recognized torrent descriptor")]
    UnparseableFile {
        /// Parser or size-limit diagnostic.
        detail: String,
    },
    /// The file could not be opened or read.
    #[error("unreadable file")]
    UnreadableFile {
        /// I/O error kind reported by the filesystem.
        kind: ErrorKind,
        /// I/O error message.
        detail: String,
    },
}

impl CandidateError {
    fn unreadable(err: &std::io::Error) -> Self {
        Self::UnreadableFile {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }

    /// Underlying diagnostic.
    pub fn detail(&self) -> &str {
        match self {
            Self::UnparseableFile { detail } | Self::UnreadableFile { detail, .. } => detail,
        }
    }
}

/// Result of validating one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The candidate is forwarded.
    Valid(TorrentSummary),
    /// The candidate is excluded and reported.
    Invalid(CandidateError),
}

/// A candidate that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedTorrent {
    /// Selected path.
    pub path: PathBuf,
    /// What the parser found in it.
    pub summary: TorrentSummary,
}

/// A candidate that failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Selected path.
    pub path: PathBuf,
    /// Why it was excluded.
    pub error: CandidateError,
}

impl Rejection {
    /// User-facing reason.
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Aggregate decision for one confirm attempt.
///
/// `Proceed` always carries at least one accepted torrent and `Retry` at least
/// one rejection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmDecision {
    /// Close the dialog and hand these torrents to the caller.
    Proceed(Vec<AcceptedTorrent>),
    /// Keep the dialog open and report these entries.
    Retry(Vec<Rejection>),
}

impl ConfirmDecision {
    /// Accepted paths in selection order (empty for `Retry`).
    pub fn accepted_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Proceed(accepted) => accepted.iter().map(|a| a.path.clone()).collect(),
            Self::Retry(_) => Vec::new(),
        }
    }

    /// Whether the dialog may close.
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }
}

/// Confirm hook a file dialog calls before it is allowed to close.
///
/// Dialog cores receive one at construction; different file-selection
/// contexts plug in different handlers.
pub trait ConfirmHandler {
    /// Decide whether the dialog may close for this selection.
    fn on_confirm_attempt(&self, candidates: &CandidateSet) -> ConfirmDecision;
}

/// Confirm handler that only lets valid torrent descriptors through.
#[derive(Clone, Debug)]
pub struct SelectionValidator<F, P> {
    fs: F,
    parser: P,
    policy: ConfirmPolicy,
}

impl<F: FileSystem, P: MetainfoParser> SelectionValidator<F, P> {
    /// Create a validator with the default policy.
    pub fn new(fs: F, parser: P) -> Self {
        Self {
            fs,
            parser,
            policy: ConfirmPolicy::default(),
        }
    }

    /// Replace the policy.
    pub fn with_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current policy.
    pub fn policy(&self) -> &ConfirmPolicy {
        &self.policy
    }

    /// Validate one path: metadata, size limit, read, parse.
    pub fn validate(&self, path: &Path) -> ValidationOutcome {
        let md = match self.fs.metadata(path) {
            Ok(md) => md,
            Err(err) => return ValidationOutcome::Invalid(CandidateError::unreadable(&err)),
        };
        if md.is_dir {
            return ValidationOutcome::Invalid(CandidateError::UnreadableFile {
                kind: ErrorKind::IsADirectory,
                detail: "is a directory".to_string(),
            });
        }
        if let Some(limit) = self.policy.max_file_size {
            if md.len > limit {
                return ValidationOutcome::Invalid(CandidateError::UnparseableFile {
                    detail: format!("file is {} bytes, limit is {limit}", md.len),
                });
            }
        }
        let bytes = match self.fs.read(path) {
            Ok(bytes) => bytes,
            Err(err) => return ValidationOutcome::Invalid(CandidateError::unreadable(&err)),
        };
        match self.parser.parse(&bytes) {
            Ok(summary) => ValidationOutcome::Valid(summary),
            Err(err) => ValidationOutcome::Invalid(CandidateError::UnparseableFile {
                detail: err.to_string(),
            }),
        }
    }
}

impl<F: FileSystem, P: MetainfoParser> ConfirmHandler for SelectionValidator<F, P> {
    fn on_confirm_attempt(&self, candidates: &CandidateSet) -> ConfirmDecision {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for candidate in candidates {
            let path = candidate.path().to_path_buf();
            match self.validate(&path) {
                ValidationOutcome::Valid(summary) => {
                    trace_candidate_valid(&path, &summary);
                    accepted.push(AcceptedTorrent { path, summary });
                }
                ValidationOutcome::Invalid(error) => {
                    trace_candidate_invalid(&path, &error);
                    rejected.push(Rejection { path, error });
                }
            }
        }

        let decision = if accepted.is_empty() {
            ConfirmDecision::Retry(rejected)
        } else if rejected.is_empty() {
            ConfirmDecision::Proceed(accepted)
        } else {
            match self.policy.mixed {
                MixedSelectionPolicy::BestEffort => {
                    trace_dropped(&rejected);
                    ConfirmDecision::Proceed(accepted)
                }
                MixedSelectionPolicy::RejectAll => ConfirmDecision::Retry(rejected),
            }
        };
        trace_decided(candidates.len(), &decision);
        decision
    }
}

/// User-facing message for a `Retry`: one `name: reason` line per rejection.
pub fn format_rejections(rejections: &[Rejection]) -> String {
    rejections
        .iter()
        .map(|r| {
            let name = r
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| r.path.display().to_string());
            format!("{name}: {}", r.error)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(feature = "tracing")]
fn trace_candidate_valid(path: &Path, summary: &TorrentSummary) {
    trace!(
        event = "candidate.valid",
        path = %path.display(),
        name = %summary.name,
        files = summary.file_count,
        "candidate accepted"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_candidate_valid(_path: &Path, _summary: &TorrentSummary) {}

#[cfg(feature = "tracing")]
fn trace_candidate_invalid(path: &Path, error: &CandidateError) {
    trace!(
        event = "candidate.invalid",
        path = %path.display(),
        reason = %error,
        detail = error.detail(),
        "candidate rejected"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_candidate_invalid(_path: &Path, _error: &CandidateError) {}

#[cfg(feature = "tracing")]
fn trace_dropped(rejected: &[Rejection]) {
    for r in rejected {
        debug!(
            event = "candidate.dropped",
            path = %r.path.display(),
            reason = %r.error,
            "invalid torrent dropped from mixed selection"
        );
    }
}

#[cfg(not(feature = "tracing"))]
fn trace_dropped(_rejected: &[Rejection]) {}

#[cfg(feature = "tracing")]
fn trace_decided(candidates: usize, decision: &ConfirmDecision) {
    let (kind, count) = match decision {
        ConfirmDecision::Proceed(a) => ("proceed", a.len()),
        ConfirmDecision::Retry(r) => ("retry", r.len()),
    };
    debug!(
        event = "confirm.decided",
        candidates, kind, count, "confirm attempt decided"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_decided(_candidates: usize, _decision: &ConfirmDecision) {}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use crate::fs::{FileSystem, FsMetadata};

    /// In-memory filesystem keyed by path; records every read.
    #[derive(Debug, Default)]
    pub(crate) struct TestFs {
        pub(crate) files: HashMap<PathBuf, Vec<u8>>,
        pub(crate) dirs: Vec<PathBuf>,
        pub(crate) denied: Vec<PathBuf>,
        pub(crate) reads: Mutex<Vec<PathBuf>>,
    }

    impl TestFs {
        pub(crate) fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
            self.files.insert(PathBuf::from(path), bytes.into());
            self
        }

        pub(crate) fn reads(&self) -> Vec<PathBuf> {
            self.reads.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    impl FileSystem for TestFs {
        fn metadata(&self, path: &Path) -> std::io::Result<FsMetadata> {
            if self.dirs.iter().any(|d| d == path) {
                return Ok(FsMetadata {
                    is_dir: true,
                    len: 0,
                });
            }
            self.files
                .get(path)
                .map(|b| FsMetadata {
                    is_dir: false,
                    len: b.len() as u64,
                })
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
        }

        fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
            if let Ok(mut reads) = self.reads.lock() {
                reads.push(path.to_path_buf());
            }
            if self.denied.iter().any(|d| d == path) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ));
            }
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
        }
    }
}
