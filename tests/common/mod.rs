//! Shared test utilities for tablog integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Harnesses that drive a whole collector use the
//! in-memory [`fake_host::FakeHost`]; the DevTools adapter harness talks to
//! a real socket served by [`fake_devtools::FakeDevtools`].

#![allow(dead_code)]

pub mod assertions;
pub mod builders;
pub mod fake_devtools;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
