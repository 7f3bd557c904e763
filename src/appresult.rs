use axum::{http::StatusCode, response::{Html, IntoResponse, Redirect, Response}};

use crate::{include_res, res::escape};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    Status(StatusCode, String),
    Redirect(String),
}

impl AppError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Status(status, message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::status(StatusCode::NOT_FOUND, format!("that {what} doesn't exist"))
    }

    pub fn forbidden() -> Self {
        Self::status(StatusCode::FORBIDDEN, "you are not allowed to see this page")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Redirect(to) => return Redirect::to(&to).into_response(),
            AppError::Status(status, message) => (status, message),
            AppError::Internal(err) => {
                tracing::error!("{err:#}\n{}", err.backtrace());
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong on our side".to_owned())
            }
        };

        (
            status,
            Html(
                include_res!(str, "/pages/error.html")
                    .replace("{status}", status.as_str())
                    .replace("{message}", &escape(&message)),
            ),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
