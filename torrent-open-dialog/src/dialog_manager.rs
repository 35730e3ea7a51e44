use std::collections::HashMap;

use crate::dialog_core::{ConfirmOutcome, TorrentDialogCore};
use crate::{FileDialogError, Selection};

/// Opaque identifier for a torrent dialog instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DialogId(u64);

/// Manager for several open torrent dialogs.
///
/// Each dialog keeps its own confirm handler, selection and validation state;
/// nothing is shared between entries.
#[derive(Debug, Default)]
pub struct DialogManager {
    next_id: u64,
    dialogs: HashMap<DialogId, TorrentDialogCore>,
}

impl DialogManager {
    /// Create a new manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dialog core and return its id.
    pub fn open(&mut self, core: TorrentDialogCore) -> DialogId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = DialogId(self.next_id);
        self.dialogs.insert(id, core);
        id
    }

    /// Close an open dialog and return its state (if any).
    pub fn close(&mut self, id: DialogId) -> Option<TorrentDialogCore> {
        self.dialogs.remove(&id)
    }

    /// Returns `true` if the dialog exists in the manager.
    pub fn contains(&self, id: DialogId) -> bool {
        self.dialogs.contains_key(&id)
    }

    /// Number of open dialogs.
    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    /// Returns `true` when no dialog is open.
    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// Get immutable access to a dialog.
    pub fn dialog(&self, id: DialogId) -> Option<&TorrentDialogCore> {
        self.dialogs.get(&id)
    }

    /// Get mutable access to a dialog (to change selection, confirm, cancel).
    pub fn dialog_mut(&mut self, id: DialogId) -> Option<&mut TorrentDialogCore> {
        self.dialogs.get_mut(&id)
    }

    /// Drive one dialog for a UI tick.
    ///
    /// Pending background validation is polled first. If a result is produced
    /// (confirm/cancel), the dialog is removed from the manager and the result
    /// is returned.
    pub fn poll(&mut self, id: DialogId) -> Option<Result<Selection, FileDialogError>> {
        let core = self.dialogs.get_mut(&id)?;
        if let ConfirmOutcome::Pending { .. } = core.poll_validation() {
            return None;
        }
        let res = core.take_result();
        if res.is_some() {
            self.dialogs.remove(&id);
        }
        res
    }
}
