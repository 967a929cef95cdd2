// Callback Options
// Immutable success/error callbacks shared by every handle of one registration

use crate::db::traits::{DatabaseError, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Invoked after a call completes without error
pub type SuccessCallback = dyn Fn(&str, &[Value], Duration) + Send + Sync;

/// Invoked after a call completes with an error
pub type ErrorCallback = dyn Fn(&str, &[Value], Duration, &DatabaseError) + Send + Sync;

/// One intercepted call, alive only while its callback runs
#[derive(Debug)]
pub struct CallRecord<'a> {
    pub query: &'a str,
    pub args: &'a [Value],
    pub started_at: Instant,
    pub duration: Duration,
    pub outcome: Result<(), &'a DatabaseError>,
}

#[derive(Default)]
struct Callbacks {
    on_success: Option<Box<SuccessCallback>>,
    on_error: Option<Box<ErrorCallback>>,
}

/// Callback configuration. Cloning shares the same callbacks.
#[derive(Clone, Default)]
pub struct Options {
    inner: Arc<Callbacks>,
}

impl Options {
    /// Options with no callbacks; every dispatch is a no-op
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn has_on_success(&self) -> bool {
        self.inner.on_success.is_some()
    }

    pub fn has_on_error(&self) -> bool {
        self.inner.on_error.is_some()
    }

    /// Fire the callback matching the record's outcome, at most once.
    ///
    /// A panicking callback is caught and logged; it never reaches the caller.
    pub fn dispatch(&self, record: &CallRecord<'_>) {
        let fired = match record.outcome {
            Ok(()) => self.inner.on_success.as_ref().map(|cb| {
                catch_unwind(AssertUnwindSafe(|| {
                    cb(record.query, record.args, record.duration)
                }))
            }),
            Err(err) => self.inner.on_error.as_ref().map(|cb| {
                catch_unwind(AssertUnwindSafe(|| {
                    cb(record.query, record.args, record.duration, err)
                }))
            }),
        };

        if let Some(Err(_)) = fired {
            tracing::warn!(
                query = record.query,
                success = record.outcome.is_ok(),
                "query callback panicked"
            );
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("on_success", &self.has_on_success())
            .field("on_error", &self.has_on_error())
            .finish()
    }
}

#[derive(Default)]
pub struct OptionsBuilder {
    callbacks: Callbacks,
}

impl OptionsBuilder {
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &[Value], Duration) + Send + Sync + 'static,
    {
        self.callbacks.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &[Value], Duration, &DatabaseError) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Options {
        Options {
            inner: Arc::new(self.callbacks),
        }
    }
}
