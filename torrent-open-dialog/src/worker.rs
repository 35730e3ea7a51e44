//! Off-thread validation for confirm attempts.
//!
//! A worker validates one ticket and sends the decision back over a channel.
//! The dialog core polls the receiver once per UI tick and only applies the
//! decision if the generation still matches; dropping the receiver (dialog
//! cancelled, newer attempt) turns the worker's send into a no-op.
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::dialog_core::ConfirmTicket;
use crate::validator::{
    CandidateError, CandidateSet, ConfirmDecision, ConfirmHandler, Rejection,
};

#[cfg(feature = "tracing")]
use tracing::warn;

pub(crate) enum WorkerPoll {
    Pending,
    Ready(ConfirmDecision),
}

pub(crate) struct PendingValidation {
    generation: u64,
    candidates: CandidateSet,
    rx: Receiver<ConfirmDecision>,
}

impl std::fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingValidation")
            .field("generation", &self.generation)
            .field("candidates", &self.candidates.len())
            .finish_non_exhaustive()
    }
}

impl PendingValidation {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn poll(&self) -> WorkerPoll {
        match self.rx.try_recv() {
            Ok(decision) => WorkerPoll::Ready(decision),
            Err(TryRecvError::Empty) => WorkerPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                trace_worker_lost(self.generation);
                WorkerPoll::Ready(worker_lost(&self.candidates))
            }
        }
    }
}

/// Spawn a worker for `ticket`. On spawn failure the ticket is handed back so
/// the caller can validate inline.
pub(crate) fn spawn(
    handler: Arc<dyn ConfirmHandler + Send + Sync>,
    ticket: ConfirmTicket,
) -> Result<PendingValidation, (ConfirmTicket, std::io::Error)> {
    let (tx, rx) = mpsc::channel();
    let candidates = ticket.candidates.clone();
    let generation = ticket.generation;
    let spawned = std::thread::Builder::new()
        .name(format!("torrent-validate-{generation}"))
        .spawn(move || {
            let decision = handler.on_confirm_attempt(&candidates);
            let _ = tx.send(decision);
        });
    match spawned {
        Ok(_) => Ok(PendingValidation {
            generation,
            candidates: ticket.candidates,
            rx,
        }),
        Err(err) => Err((ticket, err)),
    }
}

// A worker that hung up without answering is reported like a parser failure.
fn worker_lost(candidates: &CandidateSet) -> ConfirmDecision {
    ConfirmDecision::Retry(
        candidates
            .iter()
            .map(|c| Rejection {
                path: c.path().to_path_buf(),
                error: CandidateError::UnparseableFile {
                    detail: "validation worker stopped before deciding".to_string(),
                },
            })
            .collect(),
    )
}

#[cfg(feature = "tracing")]
fn trace_worker_lost(generation: u64) {
    warn!(
        event = "confirm.worker_lost",
        generation, "validation worker exited without a decision"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_worker_lost(_generation: u64) {}
