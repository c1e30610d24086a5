//! Error types for the inthe.am client.
//!
//! # Design
//! Validation failures and transport failures are different kinds and stay
//! separate. `CoercionError` covers a single malformed scalar (timestamp,
//! identifier, enum symbol); `ValidationError` covers a whole mapping failing
//! its shape and wraps coercion failures together with the field path where
//! they happened. `ApiError` is what the request/response layer returns; it
//! wraps `ValidationError` when a server payload does not fit the entity
//! shape, and otherwise carries the HTTP status and raw body.

use thiserror::Error;

/// A raw scalar could not be turned into its canonical typed value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoercionError {
    #[error("invalid timestamp {input:?}: {source}")]
    Timestamp {
        input: String,
        source: chrono::ParseError,
    },

    #[error("invalid timestamp {input:?}: expected a leading week day name followed by \", \"")]
    MissingWeekday { input: String },

    #[error("invalid timestamp {input:?}: expected \"DD Mon YYYY HH:MM:SS +HHMM\" after the week day")]
    Layout { input: String },

    #[error("invalid identifier {input:?}: {source}")]
    Identifier { input: String, source: uuid::Error },

    #[error("{enum_name} has no symbol named {symbol:?}")]
    UnknownSymbol { enum_name: String, symbol: String },

    #[error("{enum_name} has no value {value}")]
    UnknownValue { enum_name: String, value: String },

    #[error("cannot coerce {found} into {target}")]
    NotCoercible {
        target: &'static str,
        found: &'static str,
    },
}

/// A mapping failed to conform to an entity shape.
///
/// `path` is the location of the offending value, e.g. `annotations[1].entry`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{entity}: expected a mapping, found {found}")]
    NotAMapping {
        entity: &'static str,
        found: &'static str,
    },

    #[error("{entity}: required field {field:?} is missing")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}: unexpected field {field:?}")]
    UnexpectedField { entity: &'static str, field: String },

    #[error("{path}: expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path}: string must not be empty")]
    EmptyString { path: String },

    #[error("{path}: no alternative matched ({})", .reasons.join("; "))]
    NoAlternative { path: String, reasons: Vec<String> },

    #[error("{path}: {source}")]
    Coercion {
        path: String,
        source: CoercionError,
    },

    #[error("{path}: {source}")]
    Nested {
        path: String,
        source: Box<ValidationError>,
    },
}

/// An enum definition repeated a symbol or a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnumDefinitionError {
    #[error("{enum_name}: symbol {symbol:?} defined twice")]
    DuplicateSymbol { enum_name: String, symbol: String },

    #[error("{enum_name}: value {value} bound to both {first:?} and {second:?}")]
    DuplicateValue {
        enum_name: String,
        value: String,
        first: String,
        second: String,
    },
}

/// Errors returned by `InTheAmClient` parse methods and by `Session`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 or 403: the API key was missing, wrong, or lacks access.
    #[error("{status}: not authenticated\n{body}")]
    NotAuthenticated { status: u16, body: String },

    /// 404: the requested task does not exist.
    #[error("404: not found\n{body}")]
    NotFound { body: String },

    /// Any other non-2xx status.
    #[error("{status}: unexpected response\n{body}")]
    Http { status: u16, body: String },

    /// The response body was not JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response JSON did not match the entity shape.
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),

    /// The HTTP round-trip itself failed (connection refused, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// A task convenience call was made without a live owning session.
    #[error("task is not attached to a session")]
    Detached,
}

impl ApiError {
    /// HTTP status carried by the error, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotAuthenticated { status, .. } | ApiError::Http { status, .. } => {
                Some(*status)
            }
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Errors produced while loading or checking a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key (set INTHEAM_API_KEY or `api_key`)")]
    MissingApiKey,

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
