//! Open Brewery DB adapter implementing the upstream-source port.

mod dto;
mod http_source;

pub use http_source::OpenBreweryHttpSource;
