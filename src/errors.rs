use std::collections::BTreeMap;

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

/// Field name to the list of problems found with it, e.g. `{"title": ["can't be blank"]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const CANT_BE_BLANK: &str = "can't be blank";
pub const MUST_BE_UNIQUE: &str = "must be unique";
pub const ALREADY_TAKEN: &str = "has already been taken";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("unprocessable entity: {0:?}")]
    Unprocessable(FieldErrors),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RequestErrorJsonWrapper {
    pub errors: FieldErrors,
}

impl RequestErrorJsonWrapper {
    pub fn new(key: &str, error: &str) -> RequestErrorJsonWrapper {
        let mut errors = FieldErrors::new();
        errors.insert(key.to_owned(), vec![error.to_owned()]);
        RequestErrorJsonWrapper { errors }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn unprocessable(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_owned(), vec![message.to_owned()]);
        Self::Unprocessable(errors)
    }

    /// Builds a validation error listing every blank field, or `None` when all are present.
    pub fn blank_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Option<Self> {
        let errors: FieldErrors = fields
            .into_iter()
            .filter(|(_, value)| value.map_or(true, |value| value.trim().is_empty()))
            .map(|(field, _)| (field.to_owned(), vec![CANT_BE_BLANK.to_owned()]))
            .collect();
        if errors.is_empty() {
            None
        } else {
            Some(Self::Unprocessable(errors))
        }
    }

    /// True when the store rejected a write because `table.column` must be unique.
    pub fn is_unique_violation(&self, column: &str) -> bool {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => e
                .message()
                .contains(&format!("UNIQUE constraint failed: {column}")),
            _ => false,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let (status_code, json) = match self {
            RequestError::Unprocessable(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                RequestErrorJsonWrapper {
                    errors: errors.clone(),
                },
            ),
            RequestError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                RequestErrorJsonWrapper::new("body", message),
            ),
            RequestError::NotAuthorized(message) => (
                StatusCode::UNAUTHORIZED,
                RequestErrorJsonWrapper::new("body", message),
            ),
            RequestError::Forbidden => (
                StatusCode::FORBIDDEN,
                RequestErrorJsonWrapper::new("body", "Forbidden"),
            ),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RequestErrorJsonWrapper::new("body", "Internal Server Error"),
            ),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestErrorJsonWrapper::new("body", "Internal Server Error"),
                )
            }
        };
        (status_code, Json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_reports_each_missing_field() {
        let err = RequestError::blank_fields([
            ("title", Some("Hello")),
            ("description", None),
            ("body", Some("   ")),
        ])
        .unwrap();
        let RequestError::Unprocessable(errors) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["description"], vec![CANT_BE_BLANK.to_owned()]);
        assert_eq!(errors["body"], vec![CANT_BE_BLANK.to_owned()]);
    }

    #[test]
    fn blank_fields_is_none_when_everything_is_present() {
        assert!(RequestError::blank_fields([("body", Some("text"))]).is_none());
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            RequestError::unprocessable("title", MUST_BE_UNIQUE)
                .to_json_response()
                .0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RequestError::NotFound("Comment not found").to_json_response().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::Forbidden.to_json_response().0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn validation_body_is_field_keyed() {
        let (_, Json(body)) = RequestError::unprocessable("title", MUST_BE_UNIQUE).to_json_response();
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json, serde_json::json!({"errors": {"title": ["must be unique"]}}));
    }
}
