//! Leveled log sinks handed to services and transactions.

/// Four severity-leveled message sinks.
pub trait Log: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Discards everything. Used when no log is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl Log for NullLog {
    fn debug(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

/// Forwards to the `tracing` macros under the `sqlfrag` target.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

#[cfg(feature = "tracing")]
impl Log for TracingLog {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "sqlfrag", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "sqlfrag", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "sqlfrag", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "sqlfrag", "{message}");
    }
}

impl<L: Log + ?Sized> Log for std::sync::Arc<L> {
    fn debug(&self, message: &str) {
        (**self).debug(message);
    }

    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}
