//! Error handling for the Contrail crates.
//!
//! Every fallible operation in the workspace returns a [`ContrailResult`].
//! The [`contrail_err!`] and [`contrail_bail!`] macros construct errors
//! from a format string, optionally prefixed with the variant to use:
//!
//! ```
//! use contrail_error::{contrail_err, ContrailError};
//!
//! let err = contrail_err!(UnknownId: "no flight {}", 3);
//! assert!(matches!(err, ContrailError::UnknownId(_)));
//! ```

use arrow_schema::ArrowError;

/// Convenience alias for `Result<T, ContrailError>`.
pub type ContrailResult<T> = Result<T, ContrailError>;

/// The error taxonomy shared by the client, server and protocol crates.
///
/// None of these are retried automatically: a remote dispatch may have
/// side effects on the server registry, so blind retries are not safe.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ContrailError {
    /// An identifier that was never issued, or that has been tombstoned.
    #[error("unknown flight id: {0}")]
    UnknownId(String),
    /// No active registry entry carries this key.
    #[error("unknown flight key: {0}")]
    UnknownKey(String),
    /// An upload or store collided with an existing active key.
    #[error("flight already exists: {0}")]
    DuplicateKey(String),
    /// A command payload failed to decode.
    #[error("malformed command: {0}")]
    MalformedCommand(String),
    /// The requested method is not in the capability set.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    /// The operation ran but produced a value that is not a table.
    #[error("not a table result: {0}")]
    NonTableResult(String),
    /// An admin action name the server does not know.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    /// Arguments decoded fine but do not fit the operation's signature.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The server has stopped accepting mutations.
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("{0}")]
    Generic(String),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    #[cfg(feature = "parquet")]
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Construct a [`ContrailError`], optionally naming the variant:
/// `contrail_err!("plain {}", x)` builds a `Generic` error, while
/// `contrail_err!(UnknownId: "no flight {}", x)` builds that variant.
#[macro_export]
macro_rules! contrail_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::ContrailError::$variant(format!($fmt $(, $arg)*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::ContrailError::Generic(format!($fmt $(, $arg)*))
    };
}

/// Return early with a [`contrail_err!`].
#[macro_export]
macro_rules! contrail_bail {
    ($($tt:tt)+) => {
        return Err($crate::contrail_err!($($tt)+))
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn err_macro_variants() {
        assert!(matches!(
            contrail_err!(MalformedCommand: "want {} fields", 4),
            ContrailError::MalformedCommand(msg) if msg == "want 4 fields"
        ));
        assert!(matches!(
            contrail_err!("boom"),
            ContrailError::Generic(msg) if msg == "boom"
        ));
    }

    #[test]
    fn bail_macro_returns_err() {
        fn fails() -> ContrailResult<()> {
            contrail_bail!(UnsupportedMethod: "nope");
        }
        assert!(matches!(
            fails(),
            Err(ContrailError::UnsupportedMethod(msg)) if msg == "nope"
        ));
    }
}
