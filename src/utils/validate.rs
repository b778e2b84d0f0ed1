//! Validated request extractors.
//!
//! Wrap axum's `Json` and `Query` extractors with `validator` checks so
//! handlers receive fully validated payloads or a structured 400.

use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// JSON body extractor that runs `Validate` after deserialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> AppResult<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string extractor that runs `Validate` after deserialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> AppResult<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct TestBody {
        #[validate(length(min = 1, max = 20, message = "Name must be between 1 and 20 characters"))]
        name: String,
        #[validate(range(min = 1, max = 500, message = "Cap must be between 1 and 500"))]
        cap: i32,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let request = json_request(r#"{"name": "weekly", "cap": 100}"#);
        let ValidatedJson(body) = ValidatedJson::<TestBody>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(body.name, "weekly");
        assert_eq!(body.cap, 100);
    }

    #[tokio::test]
    async fn field_violation_reports_the_field() {
        let request = json_request(r#"{"name": "", "cap": 100}"#);
        let error = ValidatedJson::<TestBody>::from_request(request, &())
            .await
            .unwrap_err();
        match error {
            AppError::ValidationErrors { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "name");
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn multiple_violations_are_collected() {
        let request = json_request(r#"{"name": "", "cap": 0}"#);
        let error = ValidatedJson::<TestBody>::from_request(request, &())
            .await
            .unwrap_err();
        match error {
            AppError::ValidationErrors { errors } => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"name"));
                assert!(fields.contains(&"cap"));
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let request = json_request("{not json");
        let error = ValidatedJson::<TestBody>::from_request(request, &())
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::BadRequest { .. }));
    }

    #[derive(Debug, Deserialize, Validate)]
    struct TestQuery {
        #[validate(range(min = 1, message = "Page must be at least 1"))]
        page: u32,
    }

    #[tokio::test]
    async fn query_validation_runs() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/test?page=0")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let error = ValidatedQuery::<TestQuery>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::ValidationErrors { .. }));
    }
}
