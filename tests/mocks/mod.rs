//! Mock infrastructure for testing external services
//!
//! This module provides a wiremock-backed stand-in for the Akash Chat
//! upstream, covering session issuance, the chat line protocol, image
//! job polling, and the model catalogue.
//!
//! The mock is designed to be reusable across test files and supports
//! various response scenarios (success, errors, edge cases).


pub use akash::*;
