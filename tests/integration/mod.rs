//! Integration tests for RDS Datadog Discovery
//!
//! These tests drive the public API end to end with an in-memory RDS
//! inventory and a mocked EC2 instance metadata service. No AWS account is
//! needed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//!
//! # Run a specific group
//! cargo test --test integration pipeline
//! cargo test --test integration location
//! ```

mod location_test;
mod pipeline_test;
