// ABOUTME: Error types for syntax and runtime failures in the interpreter

use crate::token::Token;
use thiserror::Error;

/// Syntax error raised by the parser or resolver. The parser reports it,
/// then synchronizes to the next statement boundary and keeps going.
#[derive(Error, Debug, Clone)]
#[error("[line {}] Error{}: {}", .token.line, .token.error_location(), .message)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        ParseError {
            token,
            message: message.into(),
        }
    }
}

/// Error raised while evaluating; aborts the current top-level statement
/// list and is caught exactly once, at the interpret boundary.
#[derive(Error, Debug, Clone)]
#[error("{}\n[line {}]", .message, .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token,
            message: message.into(),
        }
    }
}
