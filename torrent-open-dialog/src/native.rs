//! Native (rfd) backend.
//!
//! OS pickers close as soon as the user presses "Open", so the confirm gate
//! cannot keep them on screen. Instead the host runs the gate on the returned
//! paths and, on a refusal, shows an error box and re-opens the picker in the
//! same directory. Dismissing the picker cancels. Pressing "Cancel" on the
//! error box ends with [`FileDialogError::ValidationBlocked`].
//!
//! Notes
//! - Filters map to `rfd::FileDialog::add_filter` and accept lowercase
//!   extensions without dots (e.g. "torrent"). Wildcards are skipped.
use std::path::{Path, PathBuf};

use crate::core::{DialogMode, FileDialogError, OpenTorrentDialog, Selection};
use crate::dialog_core::ConfirmOutcome;

#[cfg(feature = "tracing")]
use tracing::trace;

impl OpenTorrentDialog {
    fn to_rfd(&self, start_dir: Option<&Path>) -> rfd::FileDialog {
        let mut d = rfd::FileDialog::new();
        if let Some(dir) = start_dir {
            d = d.set_directory(dir);
        }
        if let Some(title) = &self.title {
            d = d.set_title(title);
        }
        for f in &self.filters {
            let exts_owned: Vec<String> = f
                .extensions
                .iter()
                .filter_map(|s| plain_extension_for_native(s))
                .collect();
            let exts: Vec<&str> = exts_owned.iter().map(|s| s.as_str()).collect();
            if !exts.is_empty() {
                d = d.add_filter(&f.name, &exts);
            }
        }
        d
    }

    /// Open the native picker and block until a valid selection or cancel.
    pub fn open_blocking(self) -> Result<Selection, FileDialogError> {
        let mut core = self.build_core();
        let mut reopening = false;
        loop {
            #[cfg(feature = "tracing")]
            trace!(?self.mode, reopening, "rfd blocking open");
            let start_dir = if reopening {
                Some(core.cwd.as_path())
            } else {
                self.start_dir.as_deref()
            };
            let picked: Vec<PathBuf> = match self.mode {
                DialogMode::OpenFile => self.to_rfd(start_dir).pick_file().into_iter().collect(),
                DialogMode::OpenFiles => self.to_rfd(start_dir).pick_files().unwrap_or_default(),
            };
            if picked.is_empty() {
                core.cancel();
                return core.take_result().unwrap_or(Err(FileDialogError::Cancelled));
            }
            if let Some(parent) = picked[0].parent() {
                core.cwd = parent.to_path_buf();
            }
            core.set_selection(picked);
            match core.confirm() {
                ConfirmOutcome::Closed => {
                    return core.take_result().unwrap_or_else(|| {
                        Err(FileDialogError::Internal("closed without a result".into()))
                    });
                }
                ConfirmOutcome::KeepOpen { message } => {
                    if !show_rejection(self.title.as_deref(), &message) {
                        core.cancel();
                        return core.take_result().unwrap_or_else(|| {
                            Err(FileDialogError::ValidationBlocked(message))
                        });
                    }
                    core.dismiss_error();
                    reopening = true;
                }
                other => {
                    return Err(FileDialogError::Internal(format!(
                        "unexpected confirm outcome: {other:?}"
                    )));
                }
            }
        }
    }
}

/// Shows the rejection box; `true` means the user wants to pick again.
fn show_rejection(title: Option<&str>, message: &str) -> bool {
    let response = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title.unwrap_or("Open torrent"))
        .set_description(rejection_description(message))
        .set_buttons(rfd::MessageButtons::OkCancel)
        .show();
    !matches!(response, rfd::MessageDialogResult::Cancel)
}

fn rejection_description(message: &str) -> String {
    format!("These files cannot be opened as torrents:\n\n{message}\n\nPress OK to choose again.")
}

fn is_plain_extension_token(token: &str) -> bool {
    let t = token.trim();
    if t.is_empty() {
        return false;
    }
    !(t.contains('*') || t.contains('?'))
}

fn plain_extension_for_native(token: &str) -> Option<String> {
    if !is_plain_extension_token(token) {
        return None;
    }
    let t = token.trim().trim_start_matches('.');
    if t.is_empty() {
        return None;
    }
    Some(t.to_lowercase())
}
