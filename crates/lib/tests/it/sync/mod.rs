//! Session registry integration tests
//!
//! This module tests the SessionRegistry: identity-keyed session sharing,
//! capability rejection, single-flight creation, reference counting with a
//! grace period, failure rollback, and shutdown.

mod concurrency_tests;
mod eviction_tests;
