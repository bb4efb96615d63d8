use thiserror::Error as ThisError;

/// Errors raised by the state containers, networks and integrator settings.
///
/// Both kinds indicate a programming or configuration mistake. They are
/// reported immediately and never recovered from inside the library.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// A checked accessor or a slice/resize request fell outside the valid bounds.
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
    /// A structural invariant was violated while setting things up.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Which bound was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum OutOfRange {
    #[error("index {index} is out of range for length {len}")]
    Index { index: usize, len: usize },
    #[error("range {begin}..{end} is out of range for length {len}")]
    Range { begin: usize, end: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
