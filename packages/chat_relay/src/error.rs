use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("unknown page: {0}")]
    UnknownPage(String),

    #[error("relay hub is not running")]
    HubClosed,

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::UnknownPage(_) => StatusCode::NOT_FOUND,
            RelayError::HubClosed => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
