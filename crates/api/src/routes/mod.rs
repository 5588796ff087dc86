//! Route handlers, one module per resource.

pub mod claims;
pub mod health;
pub mod lots;
pub mod makers;
pub mod metrics;
pub mod stats;

use std::fmt::Display;
use std::str::FromStr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor that rejects with the API error body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor that rejects with the API error body.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Parses a path segment into a typed id.
pub(crate) fn parse_id<T>(raw: &str, entity: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {entity} id {raw:?}: {e}")))
}

/// Decodes a JSON body that may be omitted entirely.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid body: {e}")))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http;
    use market_store::LotId;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Notes {
        notes: Option<String>,
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let err = parse_id::<LotId>("nope", "lot").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("lot")));

        let id = LotId::new();
        assert_eq!(parse_id::<LotId>(&id.to_string(), "lot").unwrap(), id);
    }

    #[test]
    fn empty_body_decodes_to_default() {
        let notes: Notes = optional_json(&Bytes::new()).unwrap();
        assert_eq!(notes, Notes::default());

        let notes: Notes = optional_json(&Bytes::from_static(br#"{"notes":"fine"}"#)).unwrap();
        assert_eq!(notes.notes.as_deref(), Some("fine"));

        assert!(optional_json::<Notes>(&Bytes::from_static(b"{")).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Schedule {
        #[allow(dead_code)]
        at: String,
    }

    fn json_request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn json_rejections_become_bad_request() {
        for body in ["{", r#"{"other":1}"#, r#"{"at":5}"#] {
            let err = JsonBody::<Schedule>::from_request(json_request(body), &())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, ApiError::BadRequest(_)), "{body}: {err:?}");
        }

        let unlabeled = http::Request::builder()
            .method("POST")
            .body(Body::from(r#"{"at":"now"}"#))
            .unwrap();
        let err = JsonBody::<Schedule>::from_request(unlabeled, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::BadRequest(_)));

        assert!(
            JsonBody::<Schedule>::from_request(json_request(r#"{"at":"now"}"#), &())
                .await
                .is_ok()
        );
    }

    #[derive(Debug, Deserialize)]
    struct Page {
        limit: Option<usize>,
    }

    #[tokio::test]
    async fn query_rejections_become_bad_request() {
        let (mut parts, ()) = http::Request::builder()
            .uri("/lots?limit=lots")
            .body(())
            .unwrap()
            .into_parts();
        let err = QueryParams::<Page>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("limit")));

        let (mut parts, ()) = http::Request::builder()
            .uri("/lots?limit=3")
            .body(())
            .unwrap()
            .into_parts();
        let QueryParams(page) = QueryParams::<Page>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(page.limit, Some(3));
    }
}
