//! Progress reporting and cooperative cancellation.
//!
//! The engine calls [`ProgressSink::report`] every few thousand lines and at
//! fixed milestones between stages. The call is a synchronous rendezvous:
//! a host that wants to pause simply does not return yet. Returning `true`
//! aborts the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Receiver of progress updates.
pub trait ProgressSink {
    /// Report progress (0..=100). Returns `true` to abort the run.
    fn report(&mut self, percent: f64, message: &str) -> bool;
}

impl<F> ProgressSink for F
where
    F: FnMut(f64, &str) -> bool,
{
    fn report(&mut self, percent: f64, message: &str) -> bool {
        self(percent, message)
    }
}

/// Sink that ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: f64, _message: &str) -> bool {
        false
    }
}

/// Cloneable cancellation flag, settable from another thread or a signal
/// handler.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Wrap a sink so the run also stops when this token is set.
    pub fn guard<P: ProgressSink>(&self, inner: P) -> Guarded<P> {
        Guarded {
            token: self.clone(),
            inner,
        }
    }
}

impl ProgressSink for CancelToken {
    fn report(&mut self, _percent: f64, _message: &str) -> bool {
        self.is_cancelled()
    }
}

/// A sink combined with a [`CancelToken`].
#[derive(Debug)]
pub struct Guarded<P> {
    token: CancelToken,
    inner: P,
}

impl<P> Guarded<P> {
    /// The wrapped sink.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// The token this sink honours.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl<P: ProgressSink> ProgressSink for Guarded<P> {
    fn report(&mut self, percent: f64, message: &str) -> bool {
        let abort = self.inner.report(percent, message);
        if abort {
            self.token.cancel();
        }
        abort || self.token.is_cancelled()
    }
}

/// Pipeline stage, for reporting where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Tokenizing and modal tracking.
    Parsing,
    /// Dense table reconstruction.
    Reconstruction,
    /// Distance and angle computation.
    Kinematics,
    /// Binning and ranking.
    Statistics,
    /// Final callback after all work.
    Finished,
}

impl Stage {
    /// Progress message for the stage.
    pub fn message(self) -> &'static str {
        match self {
            Stage::Parsing => "Parsing G-code (Sparse)",
            Stage::Reconstruction => "Building Matrix",
            Stage::Kinematics => "Calculating Vectors",
            Stage::Statistics => "Computing Statistics",
            Stage::Finished => "Done",
        }
    }
}

/// A run stopped at the host's request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cancelled {
    /// Stage that observed the request.
    pub stage: Stage,
    /// Percent reported on the aborting callback.
    pub percent: f64,
}

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "analysis cancelled during {} at {:.1}%",
            self.stage.message(),
            self.percent
        )
    }
}

/// Counts callbacks and turns an abort into `Err(Cancelled)`.
pub(crate) struct Checkpoint<'a> {
    sink: &'a mut dyn ProgressSink,
    calls: usize,
}

impl<'a> Checkpoint<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self { sink, calls: 0 }
    }

    /// Report using the stage's own message.
    pub(crate) fn stage(&mut self, stage: Stage, percent: f64) -> Result<(), Cancelled> {
        self.report(stage, percent, stage.message())
    }

    pub(crate) fn report(
        &mut self,
        stage: Stage,
        percent: f64,
        message: &str,
    ) -> Result<(), Cancelled> {
        self.calls += 1;
        let percent = percent.clamp(0.0, 100.0);
        if self.sink.report(percent, message) {
            tracing::info!(?stage, percent, call = self.calls, "analysis cancelled");
            return Err(Cancelled { stage, percent });
        }
        Ok(())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls
    }
}
