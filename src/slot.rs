//! The one pending-request slot bridging an external completion back to the
//! caller that started it.
//!
//! The external subsystem can only express "one outstanding call, answered
//! later", so the slot holds at most one continuation. Arming an occupied
//! slot is refused (the pending request is left alone), resolving a code that
//! is not the armed one is ignored, and the chained picker flow re-arms the
//! slot inside the same critical section that consumed the first step.

use crate::error::BridgeError;
use crate::features::permissions::grant_outcome;
use crate::features::picker::{path_records, PickerArgs};
use crate::reply::{Reply, ReplySink};
use crate::request_code::{Continuation, RequestCode};
use serde_json::{json, Value};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A continuation waiting for its completion. Each variant carries exactly
/// what its code needs to continue.
#[derive(Debug)]
pub enum Pending {
    Select { sink: ReplySink },
    ReadImage { sink: ReplySink, args: PickerArgs },
    PermissionNegotiation { sink: ReplySink },
}

impl Pending {
    pub fn code(&self) -> RequestCode {
        match self {
            Pending::Select { .. } => RequestCode::Select,
            Pending::ReadImage { .. } => RequestCode::ReadImage,
            Pending::PermissionNegotiation { .. } => RequestCode::PermissionNegotiation,
        }
    }

    fn into_sink(self) -> ReplySink {
        match self {
            Pending::Select { sink }
            | Pending::ReadImage { sink, .. }
            | Pending::PermissionNegotiation { sink } => sink,
        }
    }
}

#[derive(Debug)]
struct Entry {
    pending: Pending,
    armed_at: Instant,
}

impl Entry {
    fn new(pending: Pending) -> Self {
        Self {
            pending,
            armed_at: Instant::now(),
        }
    }

    fn is_expired(&self, timeout: Option<Duration>) -> bool {
        timeout.is_some_and(|t| self.armed_at.elapsed() >= t)
    }
}

/// What the router has to do after a completion was matched.
#[derive(Debug)]
pub enum RouterDecision {
    /// No armed continuation for that code; nothing happened.
    Ignored,
    /// Answer the caller; the slot is already released.
    Deliver { sink: ReplySink, reply: Reply },
    /// The slot was re-armed under `Select`; start the picker with these
    /// arguments.
    LaunchPicker { args: PickerArgs },
}

#[derive(Debug, Default)]
pub struct ResultSlot {
    entry: Mutex<Option<Entry>>,
    timeout: Option<Duration>,
}

impl ResultSlot {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            entry: Mutex::new(None),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Entry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_some()
    }

    pub fn pending_code(&self) -> Option<RequestCode> {
        self.lock().as_ref().map(|e| e.pending.code())
    }

    /// Stores a continuation. When the slot is occupied the new sink is
    /// answered with `SlotBusy` and the pending request keeps its place,
    /// unless the pending one outlived the configured timeout, in which case
    /// it is answered with `TimedOut` and replaced.
    pub fn arm(&self, pending: Pending) -> Result<(), BridgeError> {
        let code = pending.code();
        let mut guard = self.lock();
        let expired = match guard.take() {
            Some(current) if current.is_expired(self.timeout) => Some(current),
            Some(current) => {
                let busy = current.pending.code();
                *guard = Some(current);
                drop(guard);
                tracing::error!(requested = ?code, pending = ?busy, "result slot busy");
                let err = BridgeError::SlotBusy { pending: busy };
                pending.into_sink().error(err.clone());
                return Err(err);
            }
            None => None,
        };
        *guard = Some(Entry::new(pending));
        drop(guard);

        tracing::debug!(code = ?code, policy = ?code.continuation(), "result slot armed");
        if let Some(stale) = expired {
            let stale_code = stale.pending.code();
            tracing::warn!(code = ?stale_code, "reclaiming expired result slot");
            stale
                .pending
                .into_sink()
                .error(BridgeError::TimedOut { code: stale_code });
        }
        Ok(())
    }

    /// Matches a completion against the armed continuation and consumes it.
    pub fn resolve(&self, code: RequestCode, success: bool, payload: Value) -> RouterDecision {
        let mut guard = self.lock();
        let entry = match guard.take() {
            Some(entry) if entry.pending.code() == code => entry,
            other => {
                let armed = other.as_ref().map(|e| e.pending.code());
                *guard = other;
                tracing::warn!(code = ?code, armed = ?armed, "completion without matching request");
                return RouterDecision::Ignored;
            }
        };

        if !success {
            tracing::info!(code = ?code, "request cancelled");
            return RouterDecision::Deliver {
                sink: entry.pending.into_sink(),
                reply: Reply::Cancelled(code.cancelled_payload()),
            };
        }

        match entry.pending {
            Pending::Select { sink } => RouterDecision::Deliver {
                sink,
                reply: select_reply(payload),
            },
            Pending::PermissionNegotiation { sink } => RouterDecision::Deliver {
                sink,
                reply: Reply::Success(json!(grant_outcome(&payload))),
            },
            Pending::ReadImage { sink, args } => {
                // The access step only proves the grant; its payload is dropped.
                debug_assert_eq!(code.continuation(), Continuation::Chain(RequestCode::Select));
                *guard = Some(Entry::new(Pending::Select { sink }));
                tracing::debug!("access granted, chaining picker");
                RouterDecision::LaunchPicker { args }
            }
        }
    }

    /// Releases the slot only if it is armed under `code`. Used to back out
    /// of an arm whose external launch failed.
    pub fn take(&self, code: RequestCode) -> Option<ReplySink> {
        let mut guard = self.lock();
        match guard.take() {
            Some(entry) if entry.pending.code() == code => Some(entry.pending.into_sink()),
            other => {
                *guard = other;
                None
            }
        }
    }

    /// Answers whatever is pending with `reply`, regardless of its code.
    /// Returns the code that was pending.
    pub fn force_resolve(&self, reply: Reply) -> Option<RequestCode> {
        let entry = self.lock().take()?;
        let code = entry.pending.code();
        tracing::info!(code = ?code, "force resolving pending request");
        entry.pending.into_sink().resolve(reply);
        Some(code)
    }

    /// Answers whatever is pending as cancelled, with its code's falsy
    /// payload.
    pub fn cancel_pending(&self) -> Option<RequestCode> {
        let entry = self.lock().take()?;
        let code = entry.pending.code();
        tracing::info!(code = ?code, "cancelling pending request");
        entry
            .pending
            .into_sink()
            .resolve(Reply::Cancelled(code.cancelled_payload()));
        Some(code)
    }

    /// Answers a pending request that outlived the timeout with `TimedOut`.
    pub fn sweep_expired(&self) -> Option<RequestCode> {
        let mut guard = self.lock();
        if !guard.as_ref().is_some_and(|e| e.is_expired(self.timeout)) {
            return None;
        }
        let entry = guard.take()?;
        drop(guard);
        let code = entry.pending.code();
        tracing::warn!(code = ?code, "pending request timed out");
        entry.pending.into_sink().error(BridgeError::TimedOut { code });
        Some(code)
    }
}

impl Drop for ResultSlot {
    fn drop(&mut self) {
        let entry = self
            .entry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(entry) = entry {
            let code = entry.pending.code();
            tracing::info!(code = ?code, "result slot dropped with a pending request");
            entry
                .pending
                .into_sink()
                .resolve(Reply::Cancelled(code.cancelled_payload()));
        }
    }
}

fn select_reply(payload: Value) -> Reply {
    match path_records(payload) {
        Ok(records) => Reply::Success(json!(records)),
        Err(e) => Reply::Error(BridgeError::Platform(format!("malformed_picker_result:{e}"))),
    }
}
