//! Audit lifecycle notifications.

use crate::types::{AuditReport, Violation};
use std::path::Path;

/// Receives the outcome of a run as it is reported.
///
/// Every hook has an empty default so a listener implements only what it
/// renders. Events of one file arrive together, after the file is done, and
/// files arrive in input order whatever the thread count.
#[allow(unused_variables)]
pub trait AuditListener: Send {
    /// Called once before the first file.
    fn audit_started(&mut self) {}

    /// Called before the violations of a file.
    fn file_started(&mut self, path: &Path) {}

    /// Called for each reported violation, in natural order.
    fn violation(&mut self, path: &Path, violation: &Violation) {}

    /// Called after the violations of a file.
    fn file_finished(&mut self, path: &Path) {}

    /// Called when a file could not be processed.
    fn file_error(&mut self, path: &Path, error: &dyn std::error::Error) {}

    /// Called once after the last file.
    fn audit_finished(&mut self, report: &AuditReport) {}
}

/// Type alias for boxed AuditListener trait objects.
pub type ListenerBox = Box<dyn AuditListener>;
