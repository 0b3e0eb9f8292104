//! Client failure taxonomy and its outward serialized form

use serde::{Deserialize, Serialize};

use crate::ChexError;

/// Failure raised by a transport or the server behind it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Server exception {code} ({name}): {message}")]
    Server {
        code: i32,
        name: String,
        message: String,
        stack_trace: Option<String>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Connection error ({code}): {message}")]
    Connection { code: i32, message: String },

    #[error("{0}")]
    Unknown(String),
}

/// Category tag of a serialized error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Server,
    Validation,
    Protocol,
    Unimplemented,
    Tls,
    Compression,
    Connection,
    Unknown,
}

/// Structured error handed across the host boundary as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ErrorPayload {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            name: None,
            stack_trace: None,
        }
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serializes
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"type\":\"unknown\",\"message\":{:?}}}", self.message))
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<&ClientError> for ErrorPayload {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Server { code, name, message, stack_trace } => ErrorPayload {
                kind: ErrorKind::Server,
                message: message.clone(),
                code: Some(*code as i64),
                name: Some(name.clone()),
                stack_trace: stack_trace.clone(),
            },
            ClientError::Validation(m) => ErrorPayload::new(ErrorKind::Validation, m.as_str()),
            ClientError::Protocol(m) => ErrorPayload::new(ErrorKind::Protocol, m.as_str()),
            ClientError::Unimplemented(m) => ErrorPayload::new(ErrorKind::Unimplemented, m.as_str()),
            ClientError::Tls(m) => ErrorPayload::new(ErrorKind::Tls, m.as_str()),
            ClientError::Compression(m) => ErrorPayload::new(ErrorKind::Compression, m.as_str()),
            ClientError::Connection { code, message } => ErrorPayload {
                code: Some(*code as i64),
                ..ErrorPayload::new(ErrorKind::Connection, message.as_str())
            },
            ClientError::Unknown(m) => ErrorPayload::new(ErrorKind::Unknown, m.as_str()),
        }
    }
}

impl From<&ChexError> for ErrorPayload {
    fn from(err: &ChexError) -> Self {
        match err {
            ChexError::Client(client) => client.into(),
            ChexError::Arrow(_) | ChexError::Json(_) => ErrorPayload {
                name: Some(err.variant_name().to_string()),
                ..ErrorPayload::new(ErrorKind::Unknown, err.to_string())
            },
            // Marshalling failures are caller input errors
            other => ErrorPayload {
                name: Some(other.variant_name().to_string()),
                ..ErrorPayload::new(ErrorKind::Validation, other.to_string())
            },
        }
    }
}
