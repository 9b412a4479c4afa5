use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger_core::LedgerError;
use thiserror::Error;

use crate::peers::PeerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("registration failed: {0}")]
    Bootstrap(#[from] PeerError),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(JsonRejection),

    #[error("malformed request body: {0}")]
    MalformedBody(JsonRejection),

    #[error("mining abandoned: chain tip kept moving for {0} attempts")]
    MiningAbandoned(usize),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            // a bad submission has always answered 404 on this API
            ApiError::Ledger(LedgerError::InvalidTransaction(_))
            | ApiError::MalformedTransaction(_) => StatusCode::NOT_FOUND,
            ApiError::Ledger(
                LedgerError::NotLonger { .. }
                | LedgerError::PoolChanged { .. }
                | LedgerError::IndexOverflow { .. },
            ) => StatusCode::CONFLICT,
            ApiError::Ledger(_) | ApiError::Bootstrap(_) | ApiError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MiningAbandoned(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
