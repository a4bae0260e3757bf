/// Path prefix every request is made under, matching the backend's
/// versioned REST surface.
pub const API_PREFIX: &str = "api/v1";

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Connection settings for the vitals backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, without the `api/v1` prefix.
    pub server_url: String,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        ClientConfig {
            server_url: server_url.into(),
        }
    }

    /// Server origin from `VITALS_SERVER_URL`, falling back to the local
    /// dev default.
    pub fn from_env() -> Self {
        let server_url =
            std::env::var("VITALS_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        ClientConfig::new(server_url)
    }

    /// Full base URL requests are joined to.
    pub fn api_root(&self) -> String {
        format!("{}/{}", self.server_url.trim_end_matches('/'), API_PREFIX)
    }
}
