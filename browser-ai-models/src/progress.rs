//! Download progress relay.
//!
//! Platforms report progress in whatever unit they have (a fraction, a
//! percentage, byte counts). [`ProgressMonitor`] normalises each report to a
//! fraction in `[0, 1]`, drops values that would move backwards, and forwards
//! the rest to a [`ProgressSink`].

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Receives normalised download progress.
pub trait ProgressSink: Send + Sync {
    /// Called with the loaded fraction, in `[0, 1]` and non-decreasing.
    fn emit(&self, loaded: f64);
}

/// A [`ProgressSink`] backed by a closure.
pub struct ProgressCallback {
    callback: Box<dyn Fn(f64) + Send + Sync>,
}

impl ProgressCallback {
    /// Wrap a closure.
    pub fn new(callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Wrap a closure, ready to hand to session options.
    pub fn shared(callback: impl Fn(f64) + Send + Sync + 'static) -> Arc<dyn ProgressSink> {
        Arc::new(Self::new(callback))
    }
}

impl ProgressSink for ProgressCallback {
    fn emit(&self, loaded: f64) {
        (self.callback)(loaded);
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCallback").finish_non_exhaustive()
    }
}

/// One progress report from a platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressReport {
    /// Loaded fraction.
    Fraction(f64),
    /// Loaded percentage.
    Percent(f64),
    /// Loaded and total byte counts.
    Bytes {
        /// Bytes loaded.
        loaded: u64,
        /// Total bytes.
        total: u64,
    },
}

impl ProgressReport {
    /// The report as a fraction in `[0, 1]`, if it carries one.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        let value = match *self {
            ProgressReport::Fraction(f) => f,
            ProgressReport::Percent(p) => p / 100.0,
            ProgressReport::Bytes { total: 0, .. } => return None,
            ProgressReport::Bytes { loaded, total } => loaded as f64 / total as f64,
        };
        value.is_finite().then(|| value.clamp(0.0, 1.0))
    }
}

/// Normalises reports for one initialisation and relays them to a sink.
#[derive(Clone)]
pub struct ProgressMonitor {
    sink: Arc<dyn ProgressSink>,
    last: Arc<Mutex<Option<f64>>>,
}

impl ProgressMonitor {
    /// Create a monitor relaying to `sink`.
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Relay a report. Returns the value emitted, if any.
    pub fn report(&self, report: ProgressReport) -> Option<f64> {
        let value = report.fraction()?;
        {
            let mut last = self.last.lock();
            if last.is_some_and(|prev| value < prev) {
                trace!(value, previous = ?*last, "Dropping backwards progress");
                return None;
            }
            *last = Some(value);
        }
        self.sink.emit(value);
        Some(value)
    }

    /// The last value emitted.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        *self.last.lock()
    }
}

impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}
