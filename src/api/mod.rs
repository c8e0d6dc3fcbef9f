// ABOUTME: Backend HTTP API surface consumed by the UI glue

pub mod client;

pub use client::{ApiClient, ApiEnvelope, ApiError, CallOptions, Domain, Paged};
