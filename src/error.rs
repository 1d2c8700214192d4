//! Centralised error hierarchy for the **jslox interpreter**.
//!
//! Every pipeline stage (scanner, parser, runtime) and the CLI host convert
//! their failure modes into one of the variants defined here.  This gives a
//! uniform `Result<T>` alias throughout the crate and ergonomic interplay
//! with `anyhow` in the binary, while keeping the location detail each stage
//! needs for its report.
//!
//! The module **does not** print diagnostics itself; reporting happens at the
//! `Interpreter::run` boundary.
//!
//! `return` is deliberately absent: it is a control transfer carried by
//! [`crate::interpreter::Flow`], never an error.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where scanning of the offending lexeme began.
        line: usize,
    },

    /// Syntactic (parser) error, located at the offending token.
    #[error("Error {location}: {message}")]
    Parse {
        message: String,
        line: usize,

        /// `at 'lexeme'` or `at end`.
        location: String,
    },

    /// Runtime evaluation error.  Displays as the raw message.
    #[error("{message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  The location is derived from
    /// the token the parser was looking at when it gave up.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        let location: String = if token.token_type == TokenType::EOF {
            "at end".to_string()
        } else {
            format!("at '{}'", token.lexeme)
        };

        info!(
            "Creating Parse error: line={}, {}, msg={}",
            token.line, location, message
        );

        LoxError::Parse {
            message,
            line: token.line,
            location,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Source line the error refers to, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
            LoxError::Io(_) => None,
        }
    }

    /// `true` for errors raised before execution started (lex or parse).
    pub fn is_static(&self) -> bool {
        matches!(self, LoxError::Lex { .. } | LoxError::Parse { .. })
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
