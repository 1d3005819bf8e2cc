use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use user_service::user::v1::{CommonError, Profile, User};
use user_service::{app, Directory};

fn directory() -> Directory {
    Directory::with_users([User {
        id: 7,
        name: "ada".to_string(),
        profile: Some(Profile {
            bio: "analyst".to_string(),
        }),
    }])
}

async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app(directory())
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_path_and_query_binding() {
    let (status, body) = send(Method::GET, "/v1/users/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("ada"));
    assert_eq!(body["profile"], Value::Null);

    let (_, body) = send(Method::GET, "/v1/users/7?verbose=true", None).await;
    assert_eq!(body["profile"]["bio"], json!("analyst"));
}

#[tokio::test]
async fn test_additional_binding() {
    let (status, body) = send(Method::GET, "/v1/accounts/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(7));
}

#[tokio::test]
async fn test_body_field_binding() {
    let user = json!({ "id": 9, "name": "grace", "profile": null });
    let (status, body) = send(Method::POST, "/v1/users", Some(user.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, user);
}

#[tokio::test]
async fn test_response_body_field() {
    let (status, body) = send(Method::GET, "/v1/users/7/profile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "bio": "analyst" }));
}

#[tokio::test]
async fn test_errors_render_their_status() {
    let (status, body) = send(Method::GET, "/v1/users/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "code": 1001, "reason": "USER_NOT_FOUND", "message": "user not found" })
    );
}

#[test]
fn test_error_taxonomy() {
    assert_eq!(
        CommonError::ERRORS,
        &[CommonError::Ok, CommonError::NotFound, CommonError::Internal]
    );
    assert_eq!(CommonError::Internal.status(), 500);
    assert_eq!(CommonError::Internal.reason(), "INTERNAL");
    assert_eq!(
        CommonError::NotFound.to_string(),
        "USER_NOT_FOUND: user not found"
    );
}
