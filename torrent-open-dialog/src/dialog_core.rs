use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;

use crate::core::{DialogMode, FileDialogError, FileFilter, Selection, ValidationPolicy};
use crate::validator::{CandidateSet, ConfirmDecision, ConfirmHandler, format_rejections};
use crate::worker::{self, PendingValidation, WorkerPoll};

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

/// Lifecycle of one dialog instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DialogPhase {
    /// Waiting for the user; no confirm in progress.
    #[default]
    Idle,
    /// A confirm attempt is being validated.
    Validating {
        /// Attempt being validated.
        generation: u64,
    },
    /// Terminal: the dialog produced its result.
    Closed,
}

/// Candidate snapshot for one confirm attempt, handed to whoever validates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmTicket {
    /// Monotonic confirm attempt id.
    pub generation: u64,
    /// Selection at the moment confirm was pressed.
    pub candidates: CandidateSet,
}

/// What the host must do after a confirm step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Nothing happened (empty selection, dialog busy or already closed).
    Ignored,
    /// Validation is running off-thread; keep the dialog disabled.
    Pending {
        /// Attempt being validated.
        generation: u64,
    },
    /// The dialog closed; fetch the selection with [`TorrentDialogCore::take_result`].
    Closed,
    /// The dialog stays open and should show `message`.
    KeepOpen {
        /// User-facing list of rejected files.
        message: String,
    },
    /// A decision arrived for an attempt that is no longer current and was dropped.
    Stale,
}

/// Input event for driving the dialog core without direct UI coupling.
#[derive(Clone, Debug)]
pub enum CoreEvent {
    /// Replace the selection.
    SetSelection(Vec<PathBuf>),
    /// Add or remove one path (ctrl-click).
    Toggle(PathBuf),
    /// Clear the selection.
    ClearSelection,
    /// User pressed the confirm control.
    Confirm,
    /// User dismissed the dialog.
    Cancel,
    /// User acknowledged the error message.
    DismissError,
}

/// Side effect emitted after applying a [`CoreEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreEventOutcome {
    /// No extra action required by host/UI.
    None,
    /// Disable the dialog until [`TorrentDialogCore::poll_validation`] settles.
    Busy,
    /// Close the dialog; a result is available.
    Close,
    /// Keep the dialog open and show this message.
    ShowError(String),
}

impl From<ConfirmOutcome> for CoreEventOutcome {
    fn from(outcome: ConfirmOutcome) -> Self {
        match outcome {
            ConfirmOutcome::Ignored | ConfirmOutcome::Stale => Self::None,
            ConfirmOutcome::Pending { .. } => Self::Busy,
            ConfirmOutcome::Closed => Self::Close,
            ConfirmOutcome::KeepOpen { message } => Self::ShowError(message),
        }
    }
}

/// Core state machine for a torrent open dialog.
///
/// This type contains only domain state and logic (selection, confirm gate,
/// result). It does not depend on any UI toolkit and can be unit tested by
/// driving its methods. Each instance owns its confirm handler and selection.
pub struct TorrentDialogCore {
    /// Mode.
    pub mode: DialogMode,
    /// Directory the host is showing. Hosts that list entries read it; the
    /// native picker re-opens here after a rejection.
    pub cwd: PathBuf,
    /// Filters (lower-case extensions).
    pub filters: Vec<FileFilter>,
    /// Where confirm attempts are validated.
    pub validation: ValidationPolicy,
    selected: IndexSet<PathBuf>,
    phase: DialogPhase,
    generation: u64,
    handler: Arc<dyn ConfirmHandler + Send + Sync>,
    pending: Option<PendingValidation>,
    result: Option<Result<Selection, FileDialogError>>,
    ui_error: Option<String>,
}

impl std::fmt::Debug for TorrentDialogCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorrentDialogCore")
            .field("mode", &self.mode)
            .field("cwd", &self.cwd)
            .field("selected", &self.selected)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("pending", &self.pending)
            .field("ui_error", &self.ui_error)
            .finish_non_exhaustive()
    }
}

impl TorrentDialogCore {
    /// Creates a new dialog core with the given confirm handler.
    pub fn new(mode: DialogMode, handler: Arc<dyn ConfirmHandler + Send + Sync>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            mode,
            cwd,
            filters: vec![FileFilter::torrents()],
            validation: ValidationPolicy::Sync,
            selected: IndexSet::new(),
            phase: DialogPhase::Idle,
            generation: 0,
            handler,
            pending: None,
            result: None,
            ui_error: None,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    /// `true` when no confirm attempt is running and the dialog is open.
    pub fn is_idle(&self) -> bool {
        self.phase == DialogPhase::Idle
    }

    /// `true` while a confirm attempt is being validated.
    pub fn is_validating(&self) -> bool {
        matches!(self.phase, DialogPhase::Validating { .. })
    }

    /// `true` once the dialog produced its result.
    pub fn is_closed(&self) -> bool {
        self.phase == DialogPhase::Closed
    }

    /// Latest issued confirm generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Error message to display, if the last confirm attempt was refused.
    pub fn ui_error(&self) -> Option<&str> {
        self.ui_error.as_deref()
    }

    /// Clears the displayed error.
    pub fn dismiss_error(&mut self) {
        self.ui_error = None;
    }

    /// Selected paths in selection order.
    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.selected.iter().cloned().collect()
    }

    /// Whether `path` passes the dialog's extension filters.
    ///
    /// For hosts that list `cwd` themselves. Confirmation does not consult
    /// filters; the validator decides by content.
    ///
    /// `*` matches everything; an empty filter list matches everything.
    pub fn matches_filters(&self, path: &Path) -> bool {
        matches_filters(path, &self.filters)
    }

    /// Replaces the selection. In single-file mode only the first path is kept.
    ///
    /// A confirm attempt in flight keeps its own snapshot and is unaffected.
    pub fn set_selection<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if self.is_closed() {
            return;
        }
        let cap = self.selection_cap();
        self.selected = paths.into_iter().map(Into::into).take(cap).collect();
    }

    /// Adds `path` to the selection, or removes it if already selected.
    pub fn toggle(&mut self, path: impl Into<PathBuf>) {
        if self.is_closed() {
            return;
        }
        let path = path.into();
        if self.selected.shift_remove(&path) {
            return;
        }
        if self.selection_cap() <= 1 {
            self.selected.clear();
        }
        self.selected.insert(path);
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Applies one host event and reports what the host must do next.
    pub fn handle_event(&mut self, event: CoreEvent) -> CoreEventOutcome {
        match event {
            CoreEvent::SetSelection(paths) => {
                self.set_selection(paths);
                CoreEventOutcome::None
            }
            CoreEvent::Toggle(path) => {
                self.toggle(path);
                CoreEventOutcome::None
            }
            CoreEvent::ClearSelection => {
                self.clear_selection();
                CoreEventOutcome::None
            }
            CoreEvent::Confirm => self.request_confirm().into(),
            CoreEvent::Cancel => {
                if self.is_closed() {
                    CoreEventOutcome::None
                } else {
                    self.cancel();
                    CoreEventOutcome::Close
                }
            }
            CoreEvent::DismissError => {
                self.dismiss_error();
                CoreEventOutcome::None
            }
        }
    }

    /// Confirms using the configured [`ValidationPolicy`].
    pub fn request_confirm(&mut self) -> ConfirmOutcome {
        match self.validation {
            ValidationPolicy::Sync => self.confirm(),
            ValidationPolicy::Background => self.confirm_in_background(),
        }
    }

    /// Validates the current selection on this thread and applies the decision.
    pub fn confirm(&mut self) -> ConfirmOutcome {
        let Some(ticket) = self.begin_confirm() else {
            return ConfirmOutcome::Ignored;
        };
        let decision = self.handler.on_confirm_attempt(&ticket.candidates);
        self.finish_confirm(ticket.generation, decision)
    }

    /// Starts validating the current selection on a worker thread.
    ///
    /// Call [`Self::poll_validation`] every tick until it stops returning
    /// [`ConfirmOutcome::Pending`].
    pub fn confirm_in_background(&mut self) -> ConfirmOutcome {
        let Some(ticket) = self.begin_confirm() else {
            return ConfirmOutcome::Ignored;
        };
        match worker::spawn(self.handler.clone(), ticket) {
            Ok(pending) => {
                let generation = pending.generation();
                self.pending = Some(pending);
                ConfirmOutcome::Pending { generation }
            }
            Err((ticket, err)) => {
                trace_worker_spawn_failed(&err);
                let decision = self.handler.on_confirm_attempt(&ticket.candidates);
                self.finish_confirm(ticket.generation, decision)
            }
        }
    }

    /// Applies a finished background decision, if any.
    pub fn poll_validation(&mut self) -> ConfirmOutcome {
        let Some(pending) = self.pending.as_ref() else {
            return ConfirmOutcome::Ignored;
        };
        match pending.poll() {
            WorkerPoll::Pending => ConfirmOutcome::Pending {
                generation: pending.generation(),
            },
            WorkerPoll::Ready(decision) => {
                let generation = pending.generation();
                self.pending = None;
                self.finish_confirm(generation, decision)
            }
        }
    }

    /// Snapshots the selection and enters `Validating`.
    ///
    /// Returns `None` (and changes nothing) when the dialog is not idle or
    /// nothing is selected.
    pub fn begin_confirm(&mut self) -> Option<ConfirmTicket> {
        if !self.is_idle() {
            trace_confirm_ignored(self.phase, "not_idle");
            return None;
        }
        let Some(candidates) = CandidateSet::new(self.selected.iter().cloned()) else {
            trace_confirm_ignored(self.phase, "empty_selection");
            return None;
        };
        let generation = self.generation.saturating_add(1);
        self.generation = generation;
        self.phase = DialogPhase::Validating { generation };
        self.ui_error = None;
        trace_confirm_started(generation, candidates.len());
        Some(ConfirmTicket {
            generation,
            candidates,
        })
    }

    /// Applies a decision for the attempt `generation`.
    ///
    /// Decisions for attempts that are no longer current (dialog cancelled or
    /// closed) are dropped without side effects.
    pub fn finish_confirm(&mut self, generation: u64, decision: ConfirmDecision) -> ConfirmOutcome {
        if self.phase != (DialogPhase::Validating { generation }) {
            trace_dropped_stale_decision(generation, self.generation);
            return ConfirmOutcome::Stale;
        }
        match decision {
            ConfirmDecision::Proceed(accepted) => {
                let paths = accepted.into_iter().map(|a| a.path).collect();
                self.result = Some(Ok(Selection { paths }));
                self.phase = DialogPhase::Closed;
                self.ui_error = None;
                trace_confirm_closed(generation);
                ConfirmOutcome::Closed
            }
            ConfirmDecision::Retry(rejections) => {
                let message = format_rejections(&rejections);
                self.ui_error = Some(message.clone());
                self.phase = DialogPhase::Idle;
                ConfirmOutcome::KeepOpen { message }
            }
        }
    }

    /// Cancels the dialog. Any validation still running is abandoned.
    ///
    /// Cancelling while a rejection message is shown yields
    /// [`FileDialogError::ValidationBlocked`] with that message instead of
    /// `Cancelled`.
    pub fn cancel(&mut self) {
        if self.is_closed() {
            return;
        }
        self.pending = None;
        self.phase = DialogPhase::Closed;
        self.result = Some(Err(match self.ui_error.take() {
            Some(message) => FileDialogError::ValidationBlocked(message),
            None => FileDialogError::Cancelled,
        }));
    }

    /// Returns the final result once the user confirms/cancels, and clears it.
    pub fn take_result(&mut self) -> Option<Result<Selection, FileDialogError>> {
        self.result.take()
    }

    fn selection_cap(&self) -> usize {
        match self.mode {
            DialogMode::OpenFile => 1,
            DialogMode::OpenFiles => usize::MAX,
        }
    }
}

fn matches_filters(path: &Path, filters: &[FileFilter]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    filters.iter().any(|f| {
        f.extensions
            .iter()
            .any(|x| x == "*" || ext.as_deref() == Some(x.as_str()))
    })
}

#[cfg(feature = "tracing")]
fn trace_confirm_started(generation: u64, candidates: usize) {
    trace!(
        event = "confirm.started",
        generation, candidates, "confirm attempt started"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_confirm_started(_generation: u64, _candidates: usize) {}

#[cfg(feature = "tracing")]
fn trace_confirm_ignored(phase: DialogPhase, reason: &'static str) {
    trace!(event = "confirm.ignored", ?phase, reason, "confirm ignored");
}

#[cfg(not(feature = "tracing"))]
fn trace_confirm_ignored(_phase: DialogPhase, _reason: &'static str) {}

#[cfg(feature = "tracing")]
fn trace_confirm_closed(generation: u64) {
    trace!(event = "confirm.closed", generation, "dialog closed");
}

#[cfg(not(feature = "tracing"))]
fn trace_confirm_closed(_generation: u64) {}

#[cfg(feature = "tracing")]
fn trace_dropped_stale_decision(generation: u64, current_generation: u64) {
    trace!(
        event = "confirm.dropped_stale_decision",
        generation, current_generation, "confirm dropped stale decision"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_dropped_stale_decision(_generation: u64, _current_generation: u64) {}

#[cfg(feature = "tracing")]
fn trace_worker_spawn_failed(err: &std::io::Error) {
    warn!(
        event = "confirm.worker_spawn_failed",
        error = %err,
        "validating on the caller thread"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_worker_spawn_failed(_err: &std::io::Error) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metainfo::BencodeMetainfoParser;
    use crate::metainfo::test_support::single_file;
    use crate::validator::SelectionValidator;
    use crate::validator::test_support::TestFs;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn test_fs() -> TestFs {
        TestFs::default()
            .with_file("/t/good.torrent", single_file("good", 500))
            .with_file("/t/other.torrent", single_file("other", 20_000))
            .with_file("/t/bad.txt", b"not bencode".to_vec())
    }

    fn core(mode: DialogMode) -> TorrentDialogCore {
        let validator = SelectionValidator::new(test_fs(), BencodeMetainfoParser);
        TorrentDialogCore::new(mode, Arc::new(validator))
    }

    fn paths(v: &[&str]) -> Vec<PathBuf> {
        v.iter().map(PathBuf::from).collect()
    }

    fn wait_for_decision(core: &mut TorrentDialogCore) -> ConfirmOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match core.poll_validation() {
                ConfirmOutcome::Pending { .. } => {
                    assert!(Instant::now() < deadline, "validation never finished");
                    std::thread::sleep(Duration::from_millis(5));
                }
                other => return other,
            }
        }
    }

    /// Handler that records what it saw and always proceeds with everything.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<Vec<PathBuf>>>,
    }

    impl ConfirmHandler for Recording {
        fn on_confirm_attempt(&self, candidates: &CandidateSet) -> ConfirmDecision {
            let v: Vec<PathBuf> = candidates.iter().map(|c| c.path().to_path_buf()).collect();
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(v);
            }
            SelectionValidator::new(test_fs(), BencodeMetainfoParser).on_confirm_attempt(candidates)
        }
    }

    #[test]
    fn starts_idle_with_torrent_filter() {
        let core = core(DialogMode::OpenFiles);
        assert_eq!(core.phase(), DialogPhase::Idle);
        assert!(core.matches_filters(Path::new("a.TORRENT")));
        assert!(!core.matches_filters(Path::new("a.txt")));
    }

    #[test]
    fn wildcard_filter_matches_anything() {
        let mut core = core(DialogMode::OpenFiles);
        core.filters.push(FileFilter::from(("All files", &["*"][..])));
        assert!(core.matches_filters(Path::new("notes")));
    }

    #[test]
    fn empty_selection_does_not_start_validation() {
        let mut core = core(DialogMode::OpenFiles);
        assert_eq!(core.confirm(), ConfirmOutcome::Ignored);
        assert_eq!(core.generation(), 0);
        assert!(core.is_idle());
        assert!(core.take_result().is_none());
    }

    #[test]
    fn valid_selection_closes_with_paths_in_order() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/other.torrent", "/t/good.torrent"]));
        assert_eq!(core.confirm(), ConfirmOutcome::Closed);
        assert!(core.is_closed());
        let sel = core.take_result().unwrap().unwrap();
        assert_eq!(sel.paths, paths(&["/t/other.torrent", "/t/good.torrent"]));
        assert!(core.take_result().is_none());
    }

    #[test]
    fn invalid_selection_keeps_dialog_open_with_message() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/bad.txt", "/t/missing.torrent"]));
        let outcome = core.confirm();
        assert_eq!(
            outcome,
            ConfirmOutcome::KeepOpen {
                message: "bad.txt: not a recognized torrent descriptor\n\
                          missing.torrent: unreadable file"
                    .to_string()
            }
        );
        assert!(core.is_idle());
        assert!(core.ui_error().is_some());
        assert_eq!(
            core.selected_paths(),
            paths(&["/t/bad.txt", "/t/missing.torrent"])
        );
        assert!(core.take_result().is_none());
    }

    #[test]
    fn user_can_revise_after_retry() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/bad.txt"]));
        assert!(matches!(core.confirm(), ConfirmOutcome::KeepOpen { .. }));

        core.toggle("/t/bad.txt");
        core.toggle("/t/good.torrent");
        assert_eq!(core.confirm(), ConfirmOutcome::Closed);
        assert_eq!(core.generation(), 2);
        assert!(core.ui_error().is_none());
        let sel = core.take_result().unwrap().unwrap();
        assert_eq!(sel.paths, paths(&["/t/good.torrent"]));
    }

    #[test]
    fn mixed_selection_forwards_valid_subset() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/good.torrent", "/t/bad.txt"]));
        assert_eq!(core.confirm(), ConfirmOutcome::Closed);
        let sel = core.take_result().unwrap().unwrap();
        assert_eq!(sel.paths, paths(&["/t/good.torrent"]));
    }

    #[test]
    fn single_file_mode_keeps_one_selection() {
        let mut core = core(DialogMode::OpenFile);
        core.set_selection(paths(&["/t/good.torrent", "/t/other.torrent"]));
        assert_eq!(core.selected_paths(), paths(&["/t/good.torrent"]));
        core.toggle("/t/other.torrent");
        assert_eq!(core.selected_paths(), paths(&["/t/other.torrent"]));
    }

    #[test]
    fn selection_changes_do_not_touch_in_flight_candidates() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/good.torrent"]));
        let ticket = core.begin_confirm().unwrap();
        core.set_selection(paths(&["/t/bad.txt"]));
        assert_eq!(
            ticket.candidates,
            CandidateSet::new(["/t/good.torrent"]).unwrap()
        );
        assert!(core.begin_confirm().is_none(), "second confirm while validating");
        let decision = SelectionValidator::new(test_fs(), BencodeMetainfoParser)
            .on_confirm_attempt(&ticket.candidates);
        assert_eq!(
            core.finish_confirm(ticket.generation, decision),
            ConfirmOutcome::Closed
        );
        let sel = core.take_result().unwrap().unwrap();
        assert_eq!(sel.paths, paths(&["/t/good.torrent"]));
    }

    #[test]
    fn cancel_during_validation_discards_late_proceed() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/good.torrent"]));
        let ticket = core.begin_confirm().unwrap();
        core.cancel();
        let decision = SelectionValidator::new(test_fs(), BencodeMetainfoParser)
            .on_confirm_attempt(&ticket.candidates);
        assert!(decision.is_proceed());
        assert_eq!(
            core.finish_confirm(ticket.generation, decision),
            ConfirmOutcome::Stale
        );
        assert!(matches!(
            core.take_result(),
            Some(Err(FileDialogError::Cancelled))
        ));
    }

    #[test]
    fn cancel_after_rejection_reports_blocked_validation() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/bad.txt"]));
        assert!(matches!(core.confirm(), ConfirmOutcome::KeepOpen { .. }));
        core.cancel();
        match core.take_result() {
            Some(Err(FileDialogError::ValidationBlocked(message))) => {
                assert_eq!(message, "bad.txt: not a recognized torrent descriptor");
            }
            other => panic!("expected ValidationBlocked, got {other:?}"),
        }
    }

    #[test]
    fn cancel_after_dismissed_rejection_is_plain_cancel() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/bad.txt"]));
        core.confirm();
        core.dismiss_error();
        core.cancel();
        assert!(matches!(
            core.take_result(),
            Some(Err(FileDialogError::Cancelled))
        ));
    }

    #[test]
    fn decision_for_old_generation_is_stale() {
        let mut core = core(DialogMode::OpenFiles);
        core.set_selection(paths(&["/t/bad.txt"]));
        let first = core.begin_confirm().unwrap();
        let retry = SelectionValidator::new(test_fs(), BencodeMetainfoParser)
            .on_confirm_attempt(&first.candidates);
        core.finish_confirm(first.generation, retry.clone());

        core.set_selection(paths(&["/t/good.torrent"]));
        let second = core.begin_confirm().unwrap();
        assert_eq!(
            core.finish_confirm(first.generation, retry),
            ConfirmOutcome::Stale
        );
        assert_eq!(core.phase(), DialogPhase::Validating { generation: second.generation });
    }

    #[test]
    fn background_validation_closes_after_poll() {
        let mut core = core(DialogMode::OpenFiles);
        core.validation = ValidationPolicy::Background;
        core.set_selection(paths(&["/t/good.torrent", "/t/bad.txt"]));
        assert_eq!(
            core.request_confirm(),
            ConfirmOutcome::Pending { generation: 1 }
        );
        assert!(core.is_validating());
        assert_eq!(wait_for_decision(&mut core), ConfirmOutcome::Closed);
        let sel = core.take_result().unwrap().unwrap();
        assert_eq!(sel.paths, paths(&["/t/good.torrent"]));
    }

    #[test]
    fn background_validation_cancelled_never_closes_with_selection() {
        let mut core = core(DialogMode::OpenFiles);
        core.validation = ValidationPolicy::Background;
        core.set_selection(paths(&["/t/good.torrent"]));
        assert!(matches!(
            core.request_confirm(),
            ConfirmOutcome::Pending { .. }
        ));
        core.cancel();
        assert_eq!(core.poll_validation(), ConfirmOutcome::Ignored);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(core.poll_validation(), ConfirmOutcome::Ignored);
        assert!(matches!(
            core.take_result(),
            Some(Err(FileDialogError::Cancelled))
        ));
    }

    #[test]
    fn handler_sees_selection_snapshot_in_order() {
        let handler = Arc::new(Recording::default());
        let mut core = TorrentDialogCore::new(DialogMode::OpenFiles, handler.clone());
        core.set_selection(paths(&["/t/other.torrent", "/t/good.torrent"]));
        core.confirm();
        let seen = handler.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![paths(&["/t/other.torrent", "/t/good.torrent"])]);
    }

    #[test]
    fn handle_event_drives_full_cycle() {
        let mut core = core(DialogMode::OpenFiles);
        assert_eq!(core.handle_event(CoreEvent::Confirm), CoreEventOutcome::None);

        core.handle_event(CoreEvent::SetSelection(paths(&["/t/bad.txt"])));
        assert!(matches!(
            core.handle_event(CoreEvent::Confirm),
            CoreEventOutcome::ShowError(_)
        ));
        assert_eq!(
            core.handle_event(CoreEvent::DismissError),
            CoreEventOutcome::None
        );
        assert!(core.ui_error().is_none());

        core.handle_event(CoreEvent::ClearSelection);
        core.handle_event(CoreEvent::Toggle(PathBuf::from("/t/good.torrent")));
        assert_eq!(core.handle_event(CoreEvent::Confirm), CoreEventOutcome::Close);
        assert_eq!(core.handle_event(CoreEvent::Cancel), CoreEventOutcome::None);
        assert!(core.take_result().unwrap().is_ok());
    }

    #[test]
    fn closed_dialog_ignores_further_input() {
        let mut core = core(DialogMode::OpenFiles);
        assert_eq!(core.handle_event(CoreEvent::Cancel), CoreEventOutcome::Close);
        core.set_selection(paths(&["/t/good.torrent"]));
        assert!(core.selected_paths().is_empty());
        assert_eq!(core.confirm(), ConfirmOutcome::Ignored);
    }
}
