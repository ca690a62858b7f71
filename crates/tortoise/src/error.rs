/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and rendering.

use crate::source::{SourceLocation, char_offset};
use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed template syntax, raised while compiling.
    #[error(
        "Syntax error at line {line}, column {column}: {message}",
        line = .location.line(),
        column = .location.display_column()
    )]
    Syntax {
        message: String,
        /// Start of the offending token.
        location: SourceLocation,
        /// Byte length of the offending token.
        len: usize,
    },

    /// A name could not be resolved against the render context.
    #[error("Cannot resolve \"{path}\"")]
    Context { path: String },

    /// A value had the wrong type for the operation applied to it.
    #[error("Type error: {message}")]
    Type { message: String },

    /// Converting a serializable value into a context failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TemplateError {
    pub(crate) fn syntax(message: impl Into<String>, location: SourceLocation, len: usize) -> Self {
        TemplateError::Syntax {
            message: message.into(),
            location,
            len,
        }
    }

    pub(crate) fn context(path: impl Into<String>) -> Self {
        TemplateError::Context { path: path.into() }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        TemplateError::Type {
            message: message.into(),
        }
    }

    /// Source location of the error, if it has one.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            TemplateError::Syntax { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// Render this error as a plain-text report.
    ///
    /// Syntax errors get an ariadne snippet of the offending source line.
    /// Everything else falls back to the `Display` form.
    pub fn report(&self, source: &str, filename: &str) -> String {
        use ariadne::{Config, Label, Report, ReportKind, Source};

        let TemplateError::Syntax {
            message,
            location,
            len,
        } = self
        else {
            return self.to_string();
        };

        let start = char_offset(source, location.offset);
        let end = char_offset(source, location.offset + len).max(start + 1);
        let file = filename.to_string();

        let report = Report::build(ReportKind::Error, file.clone(), start)
            .with_config(Config::default().with_color(false))
            .with_message("Invalid template syntax")
            .with_label(Label::new((file.clone(), start..end)).with_message(message))
            .finish();

        let mut output = Vec::new();
        if report.write((file, Source::from(source)), &mut output).is_err() {
            return self.to_string();
        }
        String::from_utf8(output).unwrap_or_else(|_| self.to_string())
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
