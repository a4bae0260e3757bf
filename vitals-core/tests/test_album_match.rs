//! The cover-match flow: selection side effects, shared-slot reset, and
//! the late-response regression.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use vitals_core::listening::{album_display, AlbumDisplay};
use vitals_core::{MutationKey, SelectionState};

use crate::support::{client, error_body, serve, test_album};

fn match_response() -> Json<serde_json::Value> {
    Json(json!({
        "albums": [test_album("BEST-1"), test_album("NEXT-2"), test_album("NEXT-3")]
    }))
}

#[tokio::test]
async fn settling_selects_the_best_match() {
    let app = Router::new().route(
        "/api/v1/user/album/query",
        post(|_body: axum::body::Bytes| async move { match_response() }),
    );
    let api = client(&serve(app).await);

    let matches = api.album_match(vec![0xff, 0xd8], "cover.jpg").await.unwrap();
    assert_eq!(matches.albums.len(), 3);

    let selection = api.selection().snapshot();
    assert_eq!(selection.selected_album.unwrap().catalog, "BEST-1");
    assert_eq!(selection.selected_side, Some(0));
}

#[tokio::test]
async fn failed_match_clears_the_selection() {
    let app = Router::new().route(
        "/api/v1/user/album/query",
        post(|_body: axum::body::Bytes| async move {
            (
                StatusCode::BAD_REQUEST,
                Json(error_body(400, "bad image provided")),
            )
        }),
    );
    let api = client(&serve(app).await);

    // A selection from an earlier match is discarded on failure.
    api.selection().set_selected_album(Some(test_album("STALE-1")));

    let err = api.album_match(vec![], "cover.jpg").await.unwrap_err();
    assert_eq!(err.message(), "bad image provided");
    assert_eq!(api.selection().snapshot(), SelectionState::default());
}

#[tokio::test]
async fn resetting_the_match_clears_the_selection_across_stores() {
    let app = Router::new().route(
        "/api/v1/user/album/query",
        post(|_body: axum::body::Bytes| async move { match_response() }),
    );
    let api = client(&serve(app).await);

    api.album_match(vec![0xff], "cover.jpg").await.unwrap();
    assert!(api.selection().selected_album().is_some());

    // The user dismissed the flow: only the mutation slot is reset; the
    // selection store reacts to the emitted event on its own.
    api.reset_mutation(MutationKey::AlbumMatch);

    assert!(api.mutation_state(MutationKey::AlbumMatch).is_uninitialized());
    assert_eq!(api.selection().snapshot(), SelectionState::default());
}

#[tokio::test]
async fn late_response_after_reset_does_not_resurrect_state() {
    let app = Router::new().route(
        "/api/v1/user/album/query",
        post(|_body: axum::body::Bytes| async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            match_response()
        }),
    );
    let api = Arc::new(client(&serve(app).await));

    let task_api = api.clone();
    let in_flight =
        tokio::spawn(async move { task_api.album_match(vec![0xff], "cover.jpg").await });

    // Reset while the request is still on the wire.
    tokio::time::sleep(Duration::from_millis(50)).await;
    api.reset_mutation(MutationKey::AlbumMatch);

    // The caller still gets its data back, but the shared slot stays
    // uninitialized and the selection is not repopulated.
    let matches = in_flight.await.unwrap().unwrap();
    assert_eq!(matches.albums[0].catalog, "BEST-1");
    assert!(api.mutation_state(MutationKey::AlbumMatch).is_uninitialized());
    assert_eq!(api.selection().snapshot(), SelectionState::default());
}

#[tokio::test]
async fn selection_takes_precedence_over_the_server_album() {
    let app = Router::new()
        .route(
            "/api/v1/user/album",
            get(|| async { Json(json!({ "album": test_album("SERVER-1"), "side": 0 })) }),
        )
        .route(
            "/api/v1/user/album/query",
            post(|_body: axum::body::Bytes| async move { match_response() }),
        );
    let api = client(&serve(app).await);

    api.current_album().await.unwrap();
    api.album_match(vec![0xff], "cover.jpg").await.unwrap();

    let (current, is_fetching) = api.current_album_snapshot();
    let display = album_display(&api.selection().snapshot(), current.as_ref(), is_fetching);
    assert_eq!(display, AlbumDisplay::Album(test_album("BEST-1")));

    // Dismissing the match flow falls back to the server's album.
    api.reset_mutation(MutationKey::AlbumMatch);
    let (current, is_fetching) = api.current_album_snapshot();
    let display = album_display(&api.selection().snapshot(), current.as_ref(), is_fetching);
    assert_eq!(display, AlbumDisplay::Album(test_album("SERVER-1")));
}
