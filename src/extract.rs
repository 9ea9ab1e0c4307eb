//! Request extractors whose rejections render as [`ApiError`] bodies.
//!
//! Thin wrappers over axum's `Json`, `Query` and `Path`; handlers use these
//! so a malformed body, query string or path segment answers 400 with the
//! same `{error, message, code}` shape as every other failure.

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Priced {
        #[allow(dead_code)]
        price: f64,
    }

    fn json_request(body: &str) -> Request {
        axum::http::Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = ApiJson::<Priced>::from_request(json_request(r#"{"price":"abc"}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("price"), "{}", err.message());
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let request = axum::http::Request::post("/").body(Body::from("{}")).unwrap();
        let err = ApiJson::<Priced>::from_request(request, &()).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn well_formed_json_is_extracted() {
        let ApiJson(priced) = ApiJson::<Priced>::from_request(json_request(r#"{"price":25.5}"#), &())
            .await
            .ok()
            .unwrap();
        assert_eq!(priced.price, 25.5);
    }
}
