use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorBody};

/// Transport for the vitals REST surface. Holds the session cookie jar, so
/// one `Backend` behaves like one logged-in browser session.
pub struct Backend {
    api_root: String,
    http: reqwest::Client,
}

impl Backend {
    pub fn new(config: &ClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to create HTTP client");
        Backend {
            api_root: config.api_root(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        debug!("GET {path}");
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post(&self, path: &str) -> Result<Value, ApiError> {
        debug!("POST {path}");
        self.send(self.http.post(self.url(path))).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        debug!("POST {path}");
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        debug!("DELETE {path}");
        self.send(self.http.delete(self.url(path))).await
    }

    /// Upload a single file under the given multipart field name.
    pub async fn post_multipart(
        &self,
        path: &str,
        field: &'static str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, ApiError> {
        debug!("POST {path} (multipart, {} bytes)", bytes.len());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part(field, part);
        self.send(self.http.post(self.url(path)).multipart(form))
            .await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            if text.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            // The backend attaches {status, message} bodies to failures;
            // tolerate responses without one.
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message);
            warn!("request failed with HTTP {}: {:?}", status.as_u16(), message);
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let backend = Backend::new(&ClientConfig::new("http://localhost:5000/"));
        assert_eq!(
            backend.url("/user/album"),
            "http://localhost:5000/api/v1/user/album"
        );
        assert_eq!(
            backend.url("user/me"),
            "http://localhost:5000/api/v1/user/me"
        );
    }
}
