use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use axum::{
    body::HttpBody,
    extract::{FromRequest, RequestParts},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    BoxError,
};
use hyper::header::CONTENT_TYPE;
use mime_guess::mime;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::api::ApiError;

/// Custom [`Json`] type so malformed or incomplete request bodies surface
/// as a 400 with the API's `{"error": ...}` shape instead of axum's
/// default 422.
pub struct Json<T>(pub T);

impl<T> From<T> for Json<T> {
    fn from(inner: T) -> Self {
        Self(inner)
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[async_trait]
impl<T, B> FromRequest<B> for Json<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = ApiError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.to_string())),
        }
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => (
                [(
                    CONTENT_TYPE,
                    HeaderValue::from_static(mime::APPLICATION_JSON.as_ref()),
                )],
                bytes,
            )
                .into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": format!("failed to serialize response: {}", err)
                })),
            )
                .into_response(),
        }
    }
}
