//! Test helpers module
//!
//! Fixtures and builders for driving the full service stack, over the
//! in-process store by default and over PostgreSQL when available.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
