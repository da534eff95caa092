//! Driven ports for the query pipeline.

mod macros;
pub(crate) use macros::define_port_error;

mod upstream_source;

pub use upstream_source::{
    InMemoryUpstreamSource, PageMeta, UpstreamParameters, UpstreamSource, UpstreamSourceError,
};
