//! User callbacks invoked by parsers and writers.
//!
//! Closures stand in for the free-form user parameter: whatever state a
//! callback needs is captured by the closure itself.

use std::fmt;

use crate::error::{ErrorCode, Recovery, StlResult};
use crate::triangle::Triangle;

/// What an error callback is told about a failure.
#[derive(Debug, Clone, Copy)]
pub struct ErrorEvent<'t> {
    pub code: ErrorCode,
    /// Line number (ASCII) or byte offset (binary) of the failure.
    pub position: u64,
    /// The triangle involved, for validation failures.
    pub triangle: Option<&'t Triangle>,
}

/// Receives every accepted triangle. Returning an error aborts the stream.
pub type TriangleCallback<'a> = Box<dyn FnMut(&Triangle) -> StlResult<()> + 'a>;

/// Decides how to recover from a failure.
pub type ErrorCallback<'a> = Box<dyn FnMut(&ErrorEvent<'_>) -> Recovery + 'a>;

/// Invoked once when the stream completes. Returning an error fails the stream.
pub type EofCallback<'a> = Box<dyn FnMut() -> StlResult<()> + 'a>;

/// The three optional parser callbacks.
///
/// # Example
///
/// ```
/// use stl_core::{Callbacks, Recovery};
///
/// let mut count = 0;
/// let callbacks = Callbacks::new()
///     .on_triangle(|_| {
///         count += 1;
///         Ok(())
///     })
///     .on_error(|_| Recovery::Skip);
/// # drop(callbacks);
/// ```
#[derive(Default)]
pub struct Callbacks<'a> {
    on_triangle: Option<TriangleCallback<'a>>,
    on_error: Option<ErrorCallback<'a>>,
    on_eof: Option<EofCallback<'a>>,
}

impl<'a> Callbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_triangle<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Triangle) -> StlResult<()> + 'a,
    {
        self.on_triangle = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ErrorEvent<'_>) -> Recovery + 'a,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_eof<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> StlResult<()> + 'a,
    {
        self.on_eof = Some(Box::new(f));
        self
    }

    pub(crate) fn triangle(&mut self, triangle: &Triangle) -> StlResult<()> {
        match self.on_triangle.as_mut() {
            Some(f) => f(triangle),
            None => Ok(()),
        }
    }

    pub(crate) fn error(&mut self, event: &ErrorEvent<'_>) -> Recovery {
        recover(&mut self.on_error, event)
    }

    pub(crate) fn eof(&mut self) -> StlResult<()> {
        match self.on_eof.as_mut() {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

/// Asks an optional error callback for a directive; no callback means abort.
pub(crate) fn recover(callback: &mut Option<ErrorCallback<'_>>, event: &ErrorEvent<'_>) -> Recovery {
    match callback.as_mut() {
        Some(f) => f(event),
        None => Recovery::Abort,
    }
}

impl fmt::Debug for Callbacks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_triangle", &self.on_triangle.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_eof", &self.on_eof.is_some())
            .finish()
    }
}
