//! Error handler for isolated expression failures.
//!
//! When an expression fails with anything other than a halt, the failure
//! is reported here and the expression yields null. Where the report goes
//! is configurable per render:
//! - `Log`: a `tracing` warning (default)
//! - `Buffer`: captured for inspection (tests, tooling)
//! - `Silent`: dropped
//! - `Custom`: an application callback

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use stirrup_ir::Span;

use crate::EvalError;

/// One reported failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    /// Call name of the failing expression.
    pub expression: String,
    pub span: Span,
    pub error: EvalError,
}

/// Handler that captures reports to a buffer.
#[derive(Default)]
pub struct BufferErrorHandler {
    reports: Mutex<Vec<ErrorReport>>,
}

impl BufferErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, report: ErrorReport) {
        self.reports.lock().push(report);
    }

    /// Every report captured so far.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

pub type ErrorCallback = Arc<dyn Fn(&ErrorReport) + Send + Sync>;

/// Error handler implementation using enum dispatch.
pub enum ErrorHandler {
    /// Logs a warning through `tracing`.
    Log,
    Buffer(BufferErrorHandler),
    Silent,
    Custom(ErrorCallback),
}

impl ErrorHandler {
    pub fn handle(&self, report: ErrorReport) {
        match self {
            Self::Log => tracing::warn!(
                expression = %report.expression,
                span = %report.span,
                error = %report.error,
                "expression failed"
            ),
            Self::Buffer(buffer) => buffer.report(report),
            Self::Silent => {}
            Self::Custom(callback) => callback(&report),
        }
    }

    /// Captured reports; empty for handlers that don't capture.
    pub fn reports(&self) -> Vec<ErrorReport> {
        match self {
            Self::Buffer(buffer) => buffer.reports(),
            Self::Log | Self::Silent | Self::Custom(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Log => "Log",
            Self::Buffer(_) => "Buffer",
            Self::Silent => "Silent",
            Self::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

/// Shared error handler that can be passed around.
pub type SharedErrorHandler = Arc<ErrorHandler>;

/// Create the default logging handler.
pub fn log_handler() -> SharedErrorHandler {
    Arc::new(ErrorHandler::Log)
}

/// Create a handler that captures reports.
pub fn buffer_handler() -> SharedErrorHandler {
    Arc::new(ErrorHandler::Buffer(BufferErrorHandler::new()))
}

/// Create a handler that drops reports.
pub fn silent_handler() -> SharedErrorHandler {
    Arc::new(ErrorHandler::Silent)
}

/// Create a handler forwarding reports to `callback`.
pub fn custom_handler(callback: impl Fn(&ErrorReport) + Send + Sync + 'static) -> SharedErrorHandler {
    Arc::new(ErrorHandler::Custom(Arc::new(callback)))
}
