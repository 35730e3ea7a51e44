#![deny(missing_docs)]
//! Confirm gate for open-file dialogs that pick BitTorrent metainfo files.
//!
//! A dialog host hands the selected paths to a [`ConfirmHandler`] when the
//! user presses "Open". The bundled [`SelectionValidator`] reads and parses
//! every candidate once and returns a [`ConfirmDecision`]:
//! - `Proceed` with the valid torrents (in selection order): the dialog closes.
//! - `Retry` with every rejected path and its reason: the dialog stays open,
//!   shows the message and keeps the selection.
//!
//! Two hosts:
//! - [`TorrentDialogCore`], a UI-free state machine for in-app dialogs, with
//!   optional background validation and stale-result dropping.
//! - Native (via `rfd`, feature `native-rfd`) through
//!   [`OpenTorrentDialog::open_blocking`].
//!
//! ```no_run
//! use torrent_open_dialog::{CandidateSet, ConfirmDecision, ConfirmHandler, OpenTorrentDialog};
//!
//! let validator = OpenTorrentDialog::new().validator();
//! let candidates = CandidateSet::new(["/downloads/debian.torrent"]).unwrap();
//! match validator.on_confirm_attempt(&candidates) {
//!     ConfirmDecision::Proceed(torrents) => {
//!         for t in torrents {
//!             println!("{} ({} bytes)", t.summary.name, t.summary.total_size);
//!         }
//!     }
//!     ConfirmDecision::Retry(rejected) => {
//!         eprintln!("{}", torrent_open_dialog::format_rejections(&rejected));
//!     }
//! }
//! ```

mod core;
mod dialog_core;
mod dialog_manager;
mod fs;
mod metainfo;
#[cfg(feature = "native-rfd")]
mod native;
mod validator;
mod worker;

pub use core::{
    ConfirmPolicy, DialogMode, FileDialogError, FileFilter, MixedSelectionPolicy,
    OpenTorrentDialog, Selection, ValidationPolicy,
};
pub use dialog_core::{
    ConfirmOutcome, ConfirmTicket, CoreEvent, CoreEventOutcome, DialogPhase, TorrentDialogCore,
};
pub use dialog_manager::{DialogId, DialogManager};
pub use fs::{FileSystem, FsMetadata, StdFileSystem};
pub use metainfo::{BencodeMetainfoParser, MetainfoError, MetainfoParser, TorrentSummary};
pub use validator::{
    AcceptedTorrent, CandidateError, CandidateSet, ConfirmDecision, ConfirmHandler, Rejection,
    SelectionCandidate, SelectionValidator, ValidationOutcome, format_rejections,
};
