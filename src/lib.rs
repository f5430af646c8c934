//! Core library for the qbo-tools command line application.
//!
//! The library exposes the two operator-facing workflows that power the
//! command-line interface as well as the tests. The modules are structured to
//! keep responsibilities narrow and composable: environment handling lives in
//! [`config`], token persistence in [`token`], the OAuth2 handshake in
//! [`oauth`] and [`server`], the authenticated QuickBooks reads in [`api`],
//! the JSON-to-table projection in [`flatten`], and the CSV output adapter
//! under [`io`]. The [`pull`] module orchestrates the extraction worklist.

pub mod api;
pub mod config;
pub mod error;
pub mod flatten;
pub mod io;
pub mod oauth;
pub mod pull;
pub mod server;
pub mod token;

pub use error::{Result, ToolError};
