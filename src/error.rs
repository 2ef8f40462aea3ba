//! Error types for the bitcoinkernel crate.

use thiserror::Error;

/// Result type alias for bitcoinkernel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bitcoinkernel operations.
///
/// Misuse that can only come from a bug in this crate or a broken native
/// library (a released handle being used, an unknown callback token, an
/// enum value outside the documented range) is not reported here; those
/// conditions panic.
#[derive(Error, Debug)]
pub enum Error {
    /// The shared library or one of its symbols could not be loaded.
    #[error("failed to load libbitcoinkernel: {0}")]
    LibraryLoad(String),

    /// A native constructor or copy returned null.
    #[error("failed to instantiate {0}")]
    Instantiation(&'static str),

    /// Index passed to an indexed accessor is past the end.
    #[error("index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of elements available.
        len: usize,
    },

    /// Input bytes were rejected by the native parser.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// A native serialization routine reported failure.
    #[error("failed to serialize {0}")]
    Serialization(&'static str),

    /// Option values that the kernel would reject.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Script verification failed or could not be attempted.
    #[error(transparent)]
    ScriptVerify(#[from] ScriptVerifyError),

    /// A native operation reported failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this is a library load error.
    pub fn is_library_load(&self) -> bool {
        matches!(self, Error::LibraryLoad(_))
    }

    /// Check if this is an out of bounds error.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Error::IndexOutOfBounds { .. })
    }

    /// Check if this is a script verification error.
    pub fn is_script_verify(&self) -> bool {
        matches!(self, Error::ScriptVerify(_))
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Reasons a script verification did not succeed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptVerifyError {
    /// Input index is not smaller than the number of transaction inputs.
    #[error("input index out of range")]
    TxInputIndex,

    /// Flags contain bits outside the known set.
    #[error("invalid verification flags")]
    InvalidFlags,

    /// Flags combination is rejected by the interpreter (e.g. witness without P2SH).
    #[error("invalid verification flags combination")]
    InvalidFlagsCombination,

    /// Number of spent outputs does not match the number of inputs.
    #[error("spent outputs do not match transaction inputs")]
    SpentOutputsMismatch,

    /// Taproot verification was requested without spent outputs.
    #[error("spent outputs are required for taproot verification")]
    SpentOutputsRequired,

    /// The script did not verify.
    #[error("script verification failed")]
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(Error::LibraryLoad("missing".into()).is_library_load());
        assert!(Error::IndexOutOfBounds { index: 3, len: 3 }.is_out_of_bounds());
        assert!(Error::from(ScriptVerifyError::Invalid).is_script_verify());
        assert!(Error::Configuration("x".into()).is_configuration());
        assert!(!Error::Instantiation("block").is_out_of_bounds());
    }

    #[test]
    fn test_display() {
        let err = Error::IndexOutOfBounds { index: 5, len: 2 };
        assert_eq!(err.to_string(), "index 5 out of bounds (length 2)");

        let err: Error = ScriptVerifyError::SpentOutputsMismatch.into();
        assert_eq!(
            err.to_string(),
            "spent outputs do not match transaction inputs"
        );
    }
}
