//! Request body extraction
//! Mission: Accept account payloads as JSON or as URL-encoded forms

use crate::auth::api::ApiError;
use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Body extractor that dispatches on `Content-Type`.
///
/// `application/x-www-form-urlencoded` bodies go through `Form`; everything
/// else is treated as JSON. Any rejection becomes a 400.
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                debug!(error = %e, "Rejected form body");
                ApiError::Validation("Invalid request body")
            })?;
            return Ok(Self(value));
        }

        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!(error = %e, "Rejected JSON body");
            ApiError::Validation("Invalid request body")
        })?;
        Ok(Self(value))
    }
}
