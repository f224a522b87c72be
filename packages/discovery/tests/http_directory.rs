//! Integration tests for the HTTP directory against an in-process server.

use std::net::SocketAddr;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use discovery::{
    DirectoryError, DiscoverQuery, DiscoveryError, HttpDirectory, SearchFilters, UserDirectory,
};
use serde_json::{json, Value};

async fn discover_users(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, String) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer good-token");
    if !authorized {
        let body = json!({"error": {"message": "Unauthenticated", "status": "UNAUTHENTICATED"}});
        return (StatusCode::UNAUTHORIZED, body.to_string());
    }

    match body["data"]["offset"].as_u64() {
        Some(0) => {
            let body = json!({"result": {
                "users": [{"user": {"uid": "u-1", "displayName": "Ada", "role": "both"}, "distanceKm": 3.2}],
                "total": 1,
                "hasMore": false
            }});
            (StatusCode::OK, body.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded".to_string()),
    }
}

async fn start_test_server() -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new().route("/discoverUsers", post(discover_users));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr: SocketAddr = listener.local_addr().expect("listener addr");
    let endpoint = format!("http://{addr}/discoverUsers");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test server");
    });

    (endpoint, handle)
}

fn query(offset: usize) -> DiscoverQuery {
    DiscoverQuery {
        home_location: None,
        filters: SearchFilters::new().with_max_distance_km(50),
        limit: 20,
        offset,
    }
}

#[tokio::test]
async fn test_page_is_unwrapped_from_result_envelope() {
    let (endpoint, _handle) = start_test_server().await;
    let directory = HttpDirectory::new(endpoint).with_id_token("good-token");

    let page = directory.discover(&query(0)).await.unwrap();

    assert_eq!(page.total, 1);
    assert!(!page.has_more);
    assert_eq!(page.users[0].uid(), "u-1");
    assert_eq!(page.users[0].distance_km, Some(3.2));
}

#[tokio::test]
async fn test_error_status_carries_callable_message() {
    let (endpoint, _handle) = start_test_server().await;
    let directory = HttpDirectory::new(endpoint).with_id_token("expired-token");

    let err = directory.discover(&query(0)).await.unwrap_err();

    match &err {
        DirectoryError::Rejected { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Unauthenticated");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(DiscoveryError::from(err).user_message(), "Unauthenticated");
}

#[tokio::test]
async fn test_error_status_without_envelope_reports_status() {
    let (endpoint, _handle) = start_test_server().await;
    let directory = HttpDirectory::new(endpoint).with_id_token("good-token");

    let err = directory.discover(&query(20)).await.unwrap_err();

    match &err {
        DirectoryError::Rejected { status, message } => {
            assert_eq!(*status, 500);
            assert!(message.contains("500"), "unexpected message: {message}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(
        DiscoveryError::from(err).user_message(),
        "Directory returned 500 Internal Server Error"
    );
}
