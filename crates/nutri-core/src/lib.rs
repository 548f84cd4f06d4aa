//! Core types and trait definitions for the Nutri diet ledger.
//!
//! No HTTP and no database dependencies; every other crate depends on this
//! one.

// Backend traits spell out `Send` futures themselves.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod diet;
pub mod directory;
pub mod error;
pub mod gate;
pub mod store;
pub mod subject;

pub use error::{Error, LedgerFailure, Result};
