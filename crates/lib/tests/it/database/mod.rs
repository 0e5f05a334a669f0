//! Database integration tests
//!
//! Databases opened against sync configurations share the registry's
//! session; databases opened against local configurations never get one.

mod sync_session;
