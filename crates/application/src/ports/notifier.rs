//! Notifier port
//!
//! Sink for transient user-visible notices (toasts).

use amparo_domain::Notice;

/// Delivers notices to whatever displays them.
///
/// Implementations must not block: notices are emitted from guard checks
/// and synchronizer operations.
pub trait Notifier: Send + Sync {
    /// Shows a notice.
    fn notify(&self, notice: Notice);
}
