//! JSON extractor whose rejections use the gateway error envelope

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Wrapper around `axum::Json` that answers bad bodies with `400 {error}`
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(req, state).await {
            Ok(AxumJson(value)) => Ok(Json(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection_message(&rejection))
                .with_details(rejection.body_text())),
        }
    }
}

fn rejection_message(rejection: &axum::extract::rejection::JsonRejection) -> &'static str {
    use axum::extract::rejection::JsonRejection::*;

    match rejection {
        JsonDataError(_) => "Invalid JSON data",
        JsonSyntaxError(_) => "Invalid JSON syntax",
        MissingJsonContentType(_) => "Expected Content-Type: application/json",
        BytesRejection(_) => "Failed to read request body",
        _ => "Invalid JSON request",
    }
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
