//! filterq - a toolkit for boolean filter query strings
//!
//! This library provides:
//! - Filter expression scanning, parsing and canonical rendering
//! - A rule tree model with structural edits and record evaluation
//! - A linear term index over the canonical form
//! - An incremental term editor with debounced, cancellable suggestions
//! - Configuration loading and the `filterq` command-line interface
//!
//! # Example
//!
//! ```
//! use filterq::filter::{parse_filter, render};
//!
//! let rule = parse_filter("host=web&(state=2|state=3)").unwrap();
//! assert_eq!(render(&rule), "host=web&(state=2|state=3)");
//! ```

pub mod filter;
pub mod terms;
pub mod editor;
pub mod config;
pub mod cli;
pub mod utils;
