//! AdmissionReview envelope codec
//!
//! Decodes inbound AdmissionReview documents into typed requests and encodes
//! outbound reviews. The codec holds no business logic and is built once at
//! startup; its accepted schema versions never change afterwards.

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::TypeMeta;

use crate::error::DecodeError;

/// apiVersion used for responses when the request could not be decoded
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";

/// Legacy apiVersion still sent by older API servers
pub const ADMISSION_API_VERSION_V1BETA1: &str = "admission.k8s.io/v1beta1";

/// Envelope kind
pub const ADMISSION_KIND: &str = "AdmissionReview";

/// Typed admission request as handed to the deciders
pub type Request = AdmissionRequest<DynamicObject>;

/// Wire envelope
pub type Envelope = AdmissionReview<DynamicObject>;

/// Encoder/decoder for AdmissionReview envelopes
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    accepted_versions: Vec<String>,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new([ADMISSION_API_VERSION, ADMISSION_API_VERSION_V1BETA1])
    }
}

impl EnvelopeCodec {
    /// Create a codec accepting the given AdmissionReview apiVersions
    pub fn new<I, S>(accepted_versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_versions: accepted_versions.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode a request body into an admission request
    pub fn decode(&self, body: &[u8]) -> Result<Request, DecodeError> {
        let review: Envelope = serde_json::from_slice(body)?;

        if review.types.kind != ADMISSION_KIND
            || !self
                .accepted_versions
                .iter()
                .any(|v| *v == review.types.api_version)
        {
            return Err(DecodeError::UnsupportedVersion {
                api_version: review.types.api_version,
                kind: review.types.kind,
            });
        }

        let request: Result<Request, _> = review.try_into();
        request.map_err(|e| DecodeError::MissingRequest(e.to_string()))
    }

    /// Serialize an envelope. Encoding needs no codec state; it lives here to
    /// pair with [`EnvelopeCodec::decode`].
    pub fn encode(&self, review: &Envelope) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(review)
    }

    /// Wrap a decider response into an envelope
    pub fn respond(&self, response: AdmissionResponse) -> Envelope {
        let mut review = response.into_review();
        if review.types.api_version.is_empty() {
            review.types = default_types();
        }
        review
    }

    /// Envelope reporting a decode failure; carries no UID and denies.
    ///
    /// The request's apiVersion is unknown here, so the envelope is always
    /// stamped `admission.k8s.io/v1`.
    pub fn decode_failure(&self, error: &DecodeError) -> Envelope {
        let mut review = AdmissionResponse::invalid(error.to_string()).into_review();
        review.types = default_types();
        review
    }

    /// Envelope without a response, used for paths no decider handles
    pub fn empty(&self, request: Option<&Request>) -> Envelope {
        let types = request
            .map(|r| r.types.clone())
            .filter(|t| !t.api_version.is_empty())
            .unwrap_or_else(default_types);

        AdmissionReview {
            types,
            request: None,
            response: None,
        }
    }
}

fn default_types() -> TypeMeta {
    TypeMeta {
        api_version: ADMISSION_API_VERSION.to_string(),
        kind: ADMISSION_KIND.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use serde_json::{json, Value};

    fn review(api_version: &str) -> Value {
        json!({
            "apiVersion": api_version,
            "kind": "AdmissionReview",
            "request": {
                "uid": "b6a0c5d2-1e0f-4b8a-9d55-0c3c2f6b7e11",
                "kind": {"group": "apps", "version": "v1", "kind": "Deployment"},
                "resource": {"group": "apps", "version": "v1", "resource": "deployments"},
                "operation": "CREATE",
                "namespace": "default",
                "name": "web",
                "userInfo": {"username": "system:serviceaccount:kube-system:deployment-controller"},
                "dryRun": false,
                "object": {
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "metadata": {"name": "web", "namespace": "default"}
                }
            }
        })
    }

    fn bytes(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn decodes_v1_request() {
        let codec = EnvelopeCodec::default();
        let req = codec.decode(&bytes(&review("admission.k8s.io/v1"))).unwrap();

        assert_eq!(req.uid, "b6a0c5d2-1e0f-4b8a-9d55-0c3c2f6b7e11");
        assert_eq!(req.kind.kind, "Deployment");
        assert_eq!(req.name, "web");
        assert_eq!(req.namespace.as_deref(), Some("default"));
        assert!(req.object.is_some());
    }

    #[test]
    fn decodes_v1beta1_request() {
        let codec = EnvelopeCodec::default();
        let req = codec.decode(&bytes(&review("admission.k8s.io/v1beta1")));
        assert!(req.is_ok());
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let codec = EnvelopeCodec::default();
        let err = codec
            .decode(&bytes(&review("admission.k8s.io/v2")))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { .. }));
    }

    #[test]
    fn rejects_malformed_body() {
        let codec = EnvelopeCodec::default();
        let err = codec.decode(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn rejects_review_without_request() {
        let codec = EnvelopeCodec::default();
        let body = json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"});
        let err = codec.decode(&bytes(&body)).unwrap_err();
        assert!(matches!(err, DecodeError::MissingRequest(_)));
    }

    #[test]
    fn response_round_trip_preserves_uid() {
        let codec = EnvelopeCodec::default();
        let req = codec.decode(&bytes(&review("admission.k8s.io/v1"))).unwrap();

        let envelope = codec.respond(Decision::allow().into_response(&req));
        let encoded = codec.encode(&envelope).unwrap();
        let decoded: Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(decoded["apiVersion"], "admission.k8s.io/v1");
        assert_eq!(decoded["kind"], "AdmissionReview");
        assert_eq!(decoded["response"]["uid"], req.uid.as_str());
        assert_eq!(decoded["response"]["allowed"], true);
    }

    #[test]
    fn decode_failure_envelope_denies_without_uid() {
        let codec = EnvelopeCodec::default();
        let err = codec.decode(b"[]").unwrap_err();
        let envelope = codec.decode_failure(&err);

        assert_eq!(envelope.types.api_version, ADMISSION_API_VERSION);
        let response = envelope.response.expect("failure envelope has a response");
        assert!(!response.allowed);
        assert!(response.uid.is_empty());
        assert!(!response.result.message.is_empty());
    }

    #[test]
    fn decode_failure_envelope_encodes_as_v1() {
        let codec = EnvelopeCodec::default();
        let err = codec
            .decode(&bytes(&review("admission.k8s.io/v2")))
            .unwrap_err();
        let encoded = codec.encode(&codec.decode_failure(&err)).unwrap();
        let decoded: Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(decoded["apiVersion"], "admission.k8s.io/v1");
        assert_eq!(decoded["kind"], "AdmissionReview");
        assert_eq!(decoded["response"]["allowed"], false);
    }

    #[test]
    fn v1beta1_response_echoes_request_version() {
        let codec = EnvelopeCodec::default();
        let req = codec
            .decode(&bytes(&review("admission.k8s.io/v1beta1")))
            .unwrap();

        let envelope = codec.respond(Decision::allow().into_response(&req));
        let decoded: Value = serde_json::from_slice(&codec.encode(&envelope).unwrap()).unwrap();

        assert_eq!(decoded["apiVersion"], "admission.k8s.io/v1beta1");
        assert_eq!(decoded["response"]["uid"], req.uid.as_str());
    }

    #[test]
    fn empty_envelope_has_no_response() {
        let codec = EnvelopeCodec::default();
        let encoded = codec.encode(&codec.empty(None)).unwrap();
        let decoded: Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(decoded["kind"], "AdmissionReview");
        assert!(decoded["response"].is_null());
        assert!(decoded["request"].is_null());
    }
}
