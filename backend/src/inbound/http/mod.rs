//! HTTP inbound adapter exposing the feature-server endpoints.

pub mod error;
pub mod feature_server;
pub mod health;
pub mod schemas;
pub mod state;

pub use error::ApiResult;
