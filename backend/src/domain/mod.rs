//! Transport-agnostic domain types shared by the inbound and outbound
//! adapters.
//!
//! The feature-query semantics live in the `brewery_query` crate; this module
//! only carries the error envelope and request correlation.

pub mod error;
pub mod trace_id;

pub use self::error::{Error, ErrorCode};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
