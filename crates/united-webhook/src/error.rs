//! Error types for the admission webhook
//!
//! Transport errors are answered with a plain HTTP error and never reach a
//! decider. Decode errors and object errors are reported inside the admission
//! envelope and always deny the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure to decode an inbound admission envelope
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not a well-formed AdmissionReview document
    #[error("malformed admission review: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope declares an apiVersion/kind the webhook does not speak
    #[error("unsupported admission review {api_version}/{kind}")]
    UnsupportedVersion {
        /// Declared apiVersion
        api_version: String,
        /// Declared kind
        kind: String,
    },

    /// The envelope carries no request
    #[error("invalid admission review: {0}")]
    MissingRequest(String),
}

/// Failure to read the target object out of an admission request
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// The request has no `object`
    #[error("admission request carries no object")]
    Missing,

    /// The object does not deserialize into the expected resource type
    #[error("could not unmarshal raw object: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors answered directly at the HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The request body was empty
    #[error("empty body")]
    EmptyBody,

    /// The request body is not declared as JSON
    #[error("invalid Content-Type {0:?}, expect `application/json`")]
    UnsupportedMediaType(String),

    /// The response envelope could not be serialized
    #[error("could not encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::EmptyBody => StatusCode::BAD_REQUEST,
            WebhookError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WebhookError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Errors from bringing up the HTTPS listener
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Certificate or key could not be loaded
    #[error("TLS config error: {0}")]
    Tls(#[source] std::io::Error),

    /// The listener failed while serving
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
