//! Extractors that report rejections through the error envelope.
//!
//! axum's own `Json`, `Query` and `Path` reject with a plain-text body. These wrappers turn every
//! rejection into [`Error::BadRequest`] so clients always get `{success: false, error, message}`.

use axum::{
    Json,
    body::Bytes,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::errors::Error;

/// JSON request body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => Err(Error::bad_request("Expected a JSON request body")),
            Err(rejection) => Err(Error::bad_request(format!("Invalid request body: {}", rejection.body_text()))),
        }
    }
}

/// JSON body that may be omitted entirely; an empty body parses to `T::default()`.
///
/// Only the raw bytes are read during extraction. Handlers call [`OptionalJsonBody::parse`] once
/// they have resolved the target resource, so an unknown id reports 404 whatever the body holds.
#[derive(Debug)]
pub struct OptionalJsonBody<T> {
    bytes: Bytes,
    _body: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + Default> OptionalJsonBody<T> {
    pub fn parse(&self) -> Result<T, Error> {
        if self.bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&self.bytes).map_err(|e| Error::bad_request(format!("Invalid request body: {e}")))
    }
}

impl<T, S> FromRequest<S> for OptionalJsonBody<T>
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::bad_request(format!("Invalid request body: {}", e.body_text())))?;

        Ok(Self {
            bytes,
            _body: PhantomData,
        })
    }
}

/// Query string parameters.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| Error::bad_request(format!("Invalid query parameters: {}", rejection.body_text())))
    }
}

/// A single UUID path segment, e.g. `{car_id}`.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub Uuid);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| Error::bad_request(rejection.body_text()))?;

        Uuid::parse_str(&raw)
            .map(Self)
            .map_err(|_| Error::bad_request(format!("Invalid id '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::{Value, json};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Flag {
        on: Option<bool>,
    }

    async fn echo(JsonBody(body): JsonBody<Value>) -> axum::Json<Value> {
        axum::Json(body)
    }

    async fn flag(body: OptionalJsonBody<Flag>) -> Result<String, Error> {
        Ok(format!("{:?}", body.parse()?.on))
    }

    async fn id(PathId(id): PathId) -> String {
        id.to_string()
    }

    fn server() -> TestServer {
        let router = Router::new()
            .route("/echo", post(echo))
            .route("/flag", post(flag))
            .route("/things/{id}", post(id));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_envelope() {
        let response = server()
            .post("/echo")
            .content_type("application/json")
            .bytes(Bytes::from_static(b"{not json"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Validation error"));
    }

    #[tokio::test]
    async fn test_optional_body_may_be_empty() {
        let server = server();
        assert_eq!(server.post("/flag").await.text(), "None");
        assert_eq!(server.post("/flag").json(&json!({"on": true})).await.text(), "Some(true)");

        let response = server.post("/flag").content_type("application/json").bytes(Bytes::from_static(b"{on")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_uuid_in_path_is_bad_request() {
        let response = server().post("/things/not-a-uuid").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], json!("Invalid id 'not-a-uuid'"));
    }
}
