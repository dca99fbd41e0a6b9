use derive_more::Display;

/// The log volume of an [`ArrayIO`](super::ArrayIO) session.
///
/// Verbosity only controls which session events are logged. It never changes the outcome of an operation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Display)]
pub enum Verbosity {
    /// Log nothing but warnings and errors.
    #[default]
    #[display("off")]
    Off,
    /// Log dataset creation and appended rows with [`log::info!`].
    #[display("informational")]
    Informational,
    /// Additionally log every selection and transfer with [`log::debug!`].
    #[display("diagnostic")]
    Diagnostic,
}

impl Verbosity {
    /// Returns true if informational events are logged.
    #[must_use]
    pub fn informational(self) -> bool {
        self >= Self::Informational
    }

    /// Returns true if diagnostic events are logged.
    #[must_use]
    pub fn diagnostic(self) -> bool {
        self >= Self::Diagnostic
    }
}
