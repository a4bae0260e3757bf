//! Sign-up: server errors surface as values, local validation never
//! reaches the network.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use vitals_core::{MutationKey, SignUpError};

use crate::support::{client, error_body, serve};

#[tokio::test]
async fn successful_sign_up_posts_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let route_calls = calls.clone();
    let app = Router::new().route(
        "/api/v1/user/sign_up",
        post(move || {
            let route_calls = route_calls.clone();
            async move {
                route_calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "status": 200, "message": "successfully signed up user" }))
            }
        }),
    );
    let api = client(&serve(app).await);

    api.sign_up("alice", "hunter2", "hunter2").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(api.mutation_state(MutationKey::SignUp).data().is_some());
}

#[tokio::test]
async fn password_mismatch_sends_nothing_and_clears_the_old_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let route_calls = calls.clone();
    let app = Router::new().route(
        "/api/v1/user/sign_up",
        post(move || {
            let route_calls = route_calls.clone();
            async move {
                route_calls.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::CONFLICT,
                    Json(error_body(409, "username already exists")),
                )
            }
        }),
    );
    let api = client(&serve(app).await);

    // First attempt fails server-side and the error sticks to the slot.
    let err = api.sign_up("alice", "a", "a").await.unwrap_err();
    assert_eq!(err, SignUpError::Api(vitals_core::ApiError::Status {
        status: 409,
        message: Some("username already exists".into()),
    }));
    assert!(api.mutation_state(MutationKey::SignUp).error().is_some());

    // Second attempt mistypes the confirmation: caught locally, the stale
    // server error is dropped, and no request goes out.
    let err = api.sign_up("alice", "a", "b").await.unwrap_err();
    assert_eq!(err, SignUpError::PasswordMismatch);
    assert_eq!(err.to_string(), "passwords do not match");
    assert!(api.mutation_state(MutationKey::SignUp).is_uninitialized());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
