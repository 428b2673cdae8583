//! PDF Chat client
//!
//! Client-side state and background job tracking for the Chat-with-PDF
//! backend: typed REST access, an event-driven store, and polling of
//! document ingestion and podcast generation.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod scheduler;
pub mod store;

pub use api::{ChatApi, HttpApi, UploadFile};
pub use config::Config;
pub use errors::ApiError;
pub use store::{AppState, JobHandle, Store, StoreSettings};

#[cfg(test)]
mod tests;
