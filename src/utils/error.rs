use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;
use rocket::Response;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::json;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug, Serialize, JsonSchema)]
pub enum AppError {
    #[error("Database error")]
    DatabaseError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Confirmation-code collision retries ran out. Practically unreachable
    // with a 32-character alphabet at length 10, but handled all the same.
    #[error("Generation exhausted: {0}")]
    GenerationExhausted(String),

    // The store could not grant the row lock within its bounded wait.
    // Callers should treat this as transient and retry.
    #[error("Contention timeout: {0}")]
    ContentionTimeout(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    // Transient store contention, safe to retry inside a fresh transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ContentionTimeout(_))
    }
}

// Convert sqlx::Error to the taxonomy. SQLite reports lock waits that
// exceeded busy_timeout as "database is locked"; those become
// ContentionTimeout so callers can tell "try again" from "not permitted".
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::Conflict(db_err.message().to_string())
                } else if db_err.message().contains("locked") {
                    AppError::ContentionTimeout(db_err.message().to_string())
                } else {
                    AppError::DatabaseError(db_err.message().to_string())
                }
            }
            _ => AppError::DatabaseError(err.to_string()),
        }
    }
}

// Define a type alias for the result type
pub type AppResult<T> = Result<T, AppError>;

// Implement the Responder trait for AppError
// Format all error from route level to a Http Response at route level
#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = match self {
            AppError::ValidationError(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::DatabaseError(_) => Status::InternalServerError,
            AppError::AuthError(_) => Status::Unauthorized,
            AppError::Conflict(_) => Status::Conflict,
            AppError::GenerationExhausted(_) => Status::InternalServerError,
            AppError::ContentionTimeout(_) => Status::ServiceUnavailable,
            AppError::BadRequest(_) => Status::BadRequest,
        };

        let json = json!({
            "error": self.to_string()
        });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, Cursor::new(json.to_string()))
            .ok()
    }
}
