//! Inbound adapters translating external requests into query-service calls
//! while keeping framework details at the edge.

pub mod http;
