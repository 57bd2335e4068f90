//! Admission webhook HTTP surface
//!
//! Routes AdmissionReview requests to the deployment deciders:
//! - POST /mutate - mark UnitedDeployment-owned Deployments
//! - POST /validate - reject UnitedDeployment-owned Deployments missing the marker
//!
//! Any other POSTed path is decoded but answered with an envelope carrying no
//! response.

pub mod deployment;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::{error, info, warn};

use crate::codec::{Envelope, EnvelopeCodec, Request};
use crate::decision::Decision;
use crate::error::WebhookError;
use crate::policy::AdmissionPolicy;

/// Content type required on admission requests
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Admission endpoint selected by the request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPath {
    /// Mutating endpoint
    Mutate,
    /// Validating endpoint
    Validate,
}

impl AdmissionPath {
    /// Route of the mutating endpoint
    pub const MUTATE: &'static str = "/mutate";
    /// Route of the validating endpoint
    pub const VALIDATE: &'static str = "/validate";

    /// Resolve a request path; `None` for paths without a decider
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            Self::MUTATE => Some(Self::Mutate),
            Self::VALIDATE => Some(Self::Validate),
            _ => None,
        }
    }

    /// Run the decider behind this endpoint
    pub fn decide(self, policy: &AdmissionPolicy, request: &Request) -> Decision {
        match self {
            Self::Mutate => deployment::decide_mutation(policy, request),
            Self::Validate => deployment::decide_validation(policy, request),
        }
    }
}

/// Shared state for webhook handlers
#[derive(Debug, Clone, Default)]
pub struct WebhookState {
    /// Names the deciders match against
    pub policy: AdmissionPolicy,
    /// Envelope codec
    pub codec: EnvelopeCodec,
}

impl WebhookState {
    /// Create a new webhook state
    pub fn new(policy: AdmissionPolicy, codec: EnvelopeCodec) -> Self {
        Self { policy, codec }
    }
}

/// Create the webhook router with the admission endpoints and a health check
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(AdmissionPath::MUTATE, post(admission_handler))
        .route(AdmissionPath::VALIDATE, post(admission_handler))
        .route("/healthz", get(|| async { "ok" }))
        .fallback(admission_handler)
        .with_state(state)
}

/// Handle one AdmissionReview request.
///
/// Transport problems (empty body, non-JSON content type) are answered with
/// a plain HTTP error before anything is decoded.
pub async fn admission_handler(
    State(state): State<Arc<WebhookState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    if body.is_empty() {
        warn!(path = %uri.path(), "Rejecting admission request with empty body");
        return Err(WebhookError::EmptyBody);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != JSON_CONTENT_TYPE {
        error!(
            content_type = %content_type,
            expected = JSON_CONTENT_TYPE,
            "Rejecting admission request with unsupported Content-Type"
        );
        return Err(WebhookError::UnsupportedMediaType(content_type.to_string()));
    }

    let review = dispatch(&state, uri.path(), &body);

    let encoded = state.codec.encode(&review).map_err(|e| {
        error!(error = %e, "Failed to encode admission response");
        WebhookError::Encode(e)
    })?;

    Ok(([(CONTENT_TYPE, JSON_CONTENT_TYPE)], encoded).into_response())
}

/// Decode `body`, run the decider selected by `path`, and wrap the result.
///
/// Decode failures still produce an envelope: a denying response with the
/// error message and no UID.
pub fn dispatch(state: &WebhookState, path: &str, body: &[u8]) -> Envelope {
    let request = match state.codec.decode(body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to decode admission review");
            return state.codec.decode_failure(&e);
        }
    };

    let Some(endpoint) = AdmissionPath::from_path(path) else {
        warn!(uid = %request.uid, path = %path, "No decider for path, returning empty review");
        return state.codec.empty(Some(&request));
    };

    info!(
        uid = %request.uid,
        endpoint = ?endpoint,
        kind = %request.kind.kind,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = %request.name,
        "Handling admission request"
    );

    let decision = endpoint.decide(&state.policy, &request);
    state.codec.respond(decision.into_response(&request))
}
