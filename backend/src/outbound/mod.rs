//! Outbound adapters implementing the query core's driven ports.
//!
//! Adapters translate between transport payloads and core types. They carry
//! no query logic.

pub mod open_brewery;
