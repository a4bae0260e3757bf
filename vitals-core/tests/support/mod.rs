//! Shared fixtures: an in-process stand-in for the vitals backend plus a
//! client pointed at it. Each suite assembles its own routes.

#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};
use vitals_core::models::Album;
use vitals_core::{ClientConfig, VitalsApi};

/// Serve `router` on an ephemeral local port and return its origin.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A client session against the mock backend.
pub fn client(base_url: &str) -> VitalsApi {
    VitalsApi::new(ClientConfig::new(base_url))
}

pub fn test_album(catalog: &str) -> Album {
    Album {
        catalog: catalog.to_string(),
        title: format!("Album {catalog}"),
        artist: "Test Artist".to_string(),
        num_discs: 1,
        album_cover_url: None,
    }
}

/// The backend's JSON error convention.
pub fn error_body(status: u16, message: &str) -> Value {
    json!({ "status": status, "message": message })
}
