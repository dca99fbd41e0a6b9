use std::sync::atomic::{AtomicBool, Ordering};

use crate::StorageError;

/// Failure diagnostics of a storage backend.
///
/// While enabled, failed backend operations are reported with [`log::error!`].
/// Diagnostics are enabled by default.
#[derive(Debug)]
pub struct Diagnostics {
    enabled: AtomicBool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }
}

impl Diagnostics {
    /// Returns true if diagnostics are enabled.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable diagnostics, returning the previous state.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }

    /// Disable diagnostics until the returned guard is dropped.
    ///
    /// The previous state is restored on drop, so suppressions nest.
    #[must_use]
    pub fn suppress(&self) -> DiagnosticsSuppression<'_> {
        let previous = self.set_enabled(false);
        DiagnosticsSuppression {
            diagnostics: self,
            previous,
        }
    }

    /// Report a failed `operation` if diagnostics are enabled.
    pub fn report(&self, operation: &str, err: &StorageError) {
        if self.enabled() {
            log::error!("{operation} failed: {err}");
        }
    }

    /// Report `result` as a failed `operation` if it is an error, then return it.
    ///
    /// # Errors
    /// Returns the error of `result`.
    pub fn reported<T>(
        &self,
        operation: &str,
        result: Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        if let Err(err) = &result {
            self.report(operation, err);
        }
        result
    }
}

/// Restores the previous diagnostics state when dropped. See [`Diagnostics::suppress`].
#[derive(Debug)]
pub struct DiagnosticsSuppression<'a> {
    diagnostics: &'a Diagnostics,
    previous: bool,
}

impl Drop for DiagnosticsSuppression<'_> {
    fn drop(&mut self) {
        self.diagnostics.set_enabled(self.previous);
    }
}
