//! Logging trait for Medicare client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all backend interactions passing through the
//! [`MedicareClient`](crate::MedicareClient).

use crate::Error;

/// A trait for logging Medicare client operations.
///
/// Implement this trait to capture every request body, raw response body and
/// failure.  Each attempt made by the dispatcher is logged separately, so a
/// retried submission produces several `log_request` calls.
///
/// # Example
///
/// ```rust,ignore
/// use medicare_chat::{ClientLogger, Error};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, url: &str, body: &serde_json::Value) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "POST {url} {body}").unwrap();
///     }
///
///     fn log_response(&self, url: &str, status: u16, body: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{status} {url} {body}").unwrap();
///     }
///
///     fn log_error(&self, url: &str, error: &Error) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "ERR {url} {error}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log an outgoing request and its JSON body.
    fn log_request(&self, url: &str, body: &serde_json::Value);

    /// Log the raw body of a response with a success status.
    fn log_response(&self, url: &str, status: u16, body: &str);

    /// Log a failed attempt, whether it failed in transport, status or parsing.
    fn log_error(&self, url: &str, error: &Error);
}
