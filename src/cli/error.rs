// Error handling utilities for consistent error messages and exit codes

use crate::filter::{EditError, ParseError};
use std::process;
use thiserror::Error;

/// Invalid input from the user, reported with exit code 1
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UserError(pub String);

/// Exit with a user error (exit code 1)
/// User errors are for invalid input: bad filters, bad directives, bad arguments.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Whether an error was caused by user input rather than the environment
pub fn is_user_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<UserError>().is_some()
        || err.downcast_ref::<ParseError>().is_some()
        || err.downcast_ref::<EditError>().is_some()
}
