use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::currency::CurrencyError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid form data or a business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{resource} {id} não encontrado(a)")]
    NotFound { resource: &'static str, id: i64 },

    #[error("{message}")]
    Conflict { message: String },

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Template(#[from] handlebars::RenderError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } | Error::Currency(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Database(_) | Error::Template(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the requester; internal failures stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Error::Currency(_) => "Erro: valor inválido. Use ex: 1.234,56".to_string(),
            Error::Database(_) | Error::Template(_) | Error::Other(_) => {
                "Erro interno do servidor".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {self:#}");
        } else {
            log::debug!("request rejected ({status}): {self}");
        }
        (status, self.user_message()).into_response()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
