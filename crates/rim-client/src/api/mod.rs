//! REST access to the RIM API.

mod client;
pub mod endpoints;
mod refresh;
mod request;

pub use client::{ApiClient, SessionEvent};
pub use request::{ApiRequest, ApiResponse};
