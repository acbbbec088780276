use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::error::{Error, Result};

/// Cancellation and deadline carried through every store call.
///
/// Stores call [`Context::check`] before doing any work, so a cancelled
/// or expired context stops a multi-step operation at the next store
/// boundary. Compensating steps run under [`Context::detached`], which
/// ignores both.
///
/// ```
/// use std::time::Duration;
/// use docshelf::Context;
///
/// let (ctx, handle) = Context::background()
///     .with_timeout(Duration::from_secs(5))
///     .with_cancel();
/// assert!(ctx.check().is_ok());
/// handle.cancel();
/// assert!(ctx.check().is_err());
/// assert!(ctx.detached().check().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

/// Cancels every [`Context`] cloned from the one it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        // Keep the earlier of the two deadlines.
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancelled = Some(flag.clone());
        (self, CancelHandle(flag))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns an error if the context was cancelled or its deadline passed.
    pub fn check(&self) -> Result<()> {
        if let Some(flag) = &self.cancelled
            && flag.load(Ordering::SeqCst)
        {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// A context for compensating actions: never cancelled, no deadline.
    pub fn detached(&self) -> Self {
        Self::background()
    }
}
