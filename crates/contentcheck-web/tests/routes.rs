//! HTTP route tests against stub models

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use contentcheck_classifiers::testing::stub_registry;
use contentcheck_web::{build_app, AppState, EMPTY_INPUT_WARNING};
use std::sync::Arc;
use tower::ServiceExt;

fn app(logits: [f32; 2]) -> Router {
    build_app(AppState::new(Arc::new(stub_registry(logits))))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn predict_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_predict_spam_email() {
    let response = app([0.1, 0.9])
        .oneshot(predict_request(serde_json::json!({
            "content_type": "email",
            "text": "WINNER!! Claim your prize now"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["content_type"], "email");
    assert_eq!(body["label"], "SPAM");
    assert_eq!(body["message"], "📧 Email Prediction: 🚫 SPAM");
}

#[tokio::test]
async fn test_predict_accepts_display_names() {
    let response = app([0.9, 0.1])
        .oneshot(predict_request(serde_json::json!({
            "content_type": "News Article",
            "text": "Council approves new budget"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["label"], "REAL");
    assert_eq!(body["content_type"], "news_article");
}

#[tokio::test]
async fn test_predict_empty_text_warns() {
    let response = app([0.1, 0.9])
        .oneshot(predict_request(serde_json::json!({
            "content_type": "sms",
            "text": "   "
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["status"], "warning");
    assert_eq!(body["message"], EMPTY_INPUT_WARNING);
}

#[tokio::test]
async fn test_predict_unknown_content_type_is_bad_request() {
    let response = app([0.1, 0.9])
        .oneshot(predict_request(serde_json::json!({
            "content_type": "fax",
            "text": "hello"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_health_reports_loaded_models() {
    let response = app([0.1, 0.9])
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["models_loaded"], 4);
}

#[tokio::test]
async fn test_content_types_listing() {
    let response = app([0.1, 0.9])
        .oneshot(
            Request::builder()
                .uri("/api/content-types")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let types = body["content_types"].as_array().unwrap();
    assert_eq!(types.len(), 4);
    assert_eq!(types[0]["id"], "email");
    assert_eq!(types[1]["display_name"], "SMS");
    assert_eq!(types[3]["labels"], serde_json::json!(["REAL", "FAKE"]));
}

#[tokio::test]
async fn test_index_and_unmatched_paths_serve_form() {
    for uri in ["/", "/some/client/route"] {
        let response = app([0.1, 0.9])
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Multi-Content Detection System"));
        assert!(html.contains("/api/predict"));
    }
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let response = app([0.1, 0.9])
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
