//! Storefront API Library
//!
//! HTTP handlers, application state and setup for the product image pipeline.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
