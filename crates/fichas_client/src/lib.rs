pub mod api;
pub mod client_trait;
pub mod error;
pub mod fixture;
pub mod utils;

pub use api::client::GestorClient;
pub use api::models;
pub use client_trait::{AdminApi, AdminBackend, GestorApi};
pub use error::{ApiError, ApiResult};
pub use fichas_core::Config;
pub use fixture::InMemoryGestor;
