//! Shared helpers for the client integration tests

use fichas_client::{Config, GestorClient};
use wiremock::MockServer;

/// Client pointed at `server` for both services: the workflow engine under
/// `/webhook`, the backend under `/api`.
pub fn client_for(server: &MockServer) -> GestorClient {
    let config = Config {
        n8n_base_url: Some(format!("{}/webhook", server.uri())),
        backend_base_url: Some(format!("{}/api", server.uri())),
        max_retries: 2,
        ..Config::default()
    };
    GestorClient::new(&config).expect("client builds")
}
