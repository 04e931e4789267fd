use clientgen_build::options::OptionsError;
use clientgen_schema::error::{ErrorTree, ResolveError};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<OptionsError> for Error {
    fn from(err: OptionsError) -> Self {
        let kind = match err {
            OptionsError::Invalid(_) => InputErrorKind::Invalid,
            OptionsError::Io { .. } => InputErrorKind::Unreadable,
            OptionsError::Parse(_) => InputErrorKind::Malformed,
        };

        Self::new(ErrorKind::Input(kind), ErrorOrigin::Options, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            ErrorKind::Input(InputErrorKind::Malformed),
            ErrorOrigin::Metadata,
            err.to_string(),
        )
    }
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        Self::new(
            ErrorKind::Resolve {
                code: err.code().to_string(),
            },
            ErrorOrigin::Resolve,
            err.to_string(),
        )
    }
}

impl From<ErrorTree> for Error {
    fn from(tree: ErrorTree) -> Self {
        // the first error decides the code; the message keeps all of them
        let code = tree
            .iter()
            .next()
            .map_or_else(String::new, |e| e.code().to_string());

        Self::new(
            ErrorKind::Resolve { code },
            ErrorOrigin::Resolve,
            tree.to_string(),
        )
    }
}

///
/// ErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Input(InputErrorKind),

    /// A service failed structural resolution; `code` is its first error.
    Resolve { code: String },

    /// The caller cannot remediate this.
    Internal,
}

///
/// InputErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum InputErrorKind {
    /// Parsed, but rejected by validation.
    Invalid,

    /// Not valid JSON for the expected shape.
    Malformed,

    /// Could not be read at all.
    Unreadable,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Dispatch,
    Metadata,
    Options,
    Resolve,
}
