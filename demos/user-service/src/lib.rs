//! A small user service wired up from the generated route bindings and
//! error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub mod user {
    pub mod v1 {
        include!(concat!(env!("OUT_DIR"), "/user.v1.rs"));
        include!(concat!(env!("OUT_DIR"), "/user/v1/user.sphere.rs"));
        include!(concat!(env!("OUT_DIR"), "/user/v1/user.errors.rs"));
    }
}

use user::v1::{CommonError, CreateUserRequest, GetUserRequest, User, UserServiceHttpServer};

impl IntoResponse for CommonError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "code": self.code(),
            "reason": self.reason(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

/// In-memory user directory
#[derive(Debug, Default)]
pub struct Directory {
    users: RwLock<BTreeMap<i64, User>>,
}

impl Directory {
    /// Directory holding `users`
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|user| (user.id, user)).collect()),
        }
    }

    fn find(&self, id: i64) -> Result<User, CommonError> {
        let users = self.users.read().map_err(|_| CommonError::Internal)?;
        users.get(&id).cloned().ok_or(CommonError::NotFound)
    }
}

impl UserServiceHttpServer for Directory {
    type Error = CommonError;

    async fn get_user(&self, request: GetUserRequest) -> Result<User, CommonError> {
        let mut user = self.find(request.id)?;
        if !request.verbose {
            user.profile = None;
        }
        Ok(user)
    }

    async fn create_user(&self, request: CreateUserRequest) -> Result<User, CommonError> {
        let user = request.user.unwrap_or_default();
        let mut users = self.users.write().map_err(|_| CommonError::Internal)?;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_profile(&self, request: GetUserRequest) -> Result<User, CommonError> {
        self.find(request.id)
    }
}

/// Router serving `directory`
pub fn app(directory: Directory) -> axum::Router {
    user::v1::register_user_service_http_server(axum::Router::new(), Arc::new(directory))
}
