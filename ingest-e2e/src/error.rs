use std::error;
use std::fmt;

use ingest_config::shared::ValidationError;

/// Convenient result type for case operations using [`IngestError`] as the error type.
pub type IngestResult<T> = Result<T, IngestError>;

/// Main error type for failures of the case's collaborators and setup.
///
/// [`IngestError`] covers infrastructure failures (store, transport, serialization,
/// configuration). It is deliberately separate from the classification produced by the
/// verifier, see [`crate::outcome::VerificationOutcome`], which is a value and not an error.
#[derive(Debug, Clone)]
pub struct IngestError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Error with kind and static description
    WithDescription(ErrorKind, &'static str),
    /// Error with kind, static description, and dynamic detail
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    /// Multiple aggregated errors
    Many(Vec<IngestError>),
}

/// Specific categories of errors that can occur while running a case.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Store Errors
    StoreQueryFailed,
    StoreResultInvalid,

    // Transport Errors
    TransportConnectionFailed,

    // Data & Transformation Errors
    ConversionError,
    InvalidData,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // Configuration & State Errors
    ConfigError,
    InvalidState,

    // Unknown / Uncategorized
    Unknown,
}

impl IngestError {
    /// Creates an [`IngestError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<IngestError>) -> IngestError {
        IngestError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregated errors.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }
}

impl PartialEq for IngestError {
    fn eq(&self, other: &IngestError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;

                Ok(())
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)?;

                Ok(())
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")?;
                } else if errors.len() == 1 {
                    errors[0].fmt(f)?;
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl error::Error for IngestError {}

/// Creates an [`IngestError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for IngestError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> IngestError {
        IngestError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

/// Creates an [`IngestError`] from an error kind, static description, and dynamic detail.
impl From<(ErrorKind, &'static str, String)> for IngestError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> IngestError {
        IngestError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

/// Creates an [`IngestError`] from a vector of errors for aggregation.
impl<E> From<Vec<E>> for IngestError
where
    E: Into<IngestError>,
{
    fn from(errors: Vec<E>) -> IngestError {
        IngestError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Converts [`std::io::Error`] to [`IngestError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> IngestError {
        IngestError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`IngestError`].
///
/// Payloads are only ever produced by serialization, but the in-memory pipeline parses them back,
/// so syntax and data errors map to [`ErrorKind::DeserializationError`].
impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> IngestError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        IngestError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`std::num::ParseIntError`] to [`IngestError`] with [`ErrorKind::ConversionError`].
impl From<std::num::ParseIntError> for IngestError {
    fn from(err: std::num::ParseIntError) -> IngestError {
        IngestError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConversionError,
                "Integer parsing failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts a configuration [`ValidationError`] to [`IngestError`] with [`ErrorKind::ConfigError`].
impl From<ValidationError> for IngestError {
    fn from(err: ValidationError) -> IngestError {
        IngestError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConfigError,
                "Invalid case configuration",
                err.to_string(),
            ),
        }
    }
}
