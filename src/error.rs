use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected input field, as reported back to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(Cow<'static, str>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Conflict {
        message: String,
        existing: Option<Uuid>,
    },

    #[error("invalid input")]
    InvalidInput(Vec<FieldError>),

    #[error("{0}")]
    LimitReached(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] diesel::result::Error),
}

impl Error {
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Error::InvalidInput(vec![FieldError::new(field, message)])
    }

    pub fn forbidden<M: Into<Cow<'static, str>>>(message: M) -> Self {
        Error::Forbidden(message.into())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        flatten_validation("", &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        Error::InvalidInput(fields)
    }
}

fn flatten_validation(
    prefix: &str,
    errors: &ValidationErrors,
    out: &mut Vec<FieldError>,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list.iter() {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                flatten_validation(&path, inner, out)
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items.iter() {
                    flatten_validation(
                        &format!("{}[{}]", path, index),
                        inner,
                        out,
                    )
                }
            }
        }
    }
}
