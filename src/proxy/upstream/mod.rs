// Upstream module - outbound GraphQL client

pub mod client;

pub use client::{UpstreamClient, UpstreamError, UpstreamTransport};
