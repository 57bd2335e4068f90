//! Admission decisions
//!
//! A [`Decision`] is what a decider returns for one request. It is converted
//! into the wire [`AdmissionResponse`] only at the edge, once the request's
//! correlation data is at hand.

use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use kube::core::Resource;
use tracing::error;

use crate::patch::{to_json_patch, AnnotationPatch};

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The target object could not be decoded; reported as the status message
    Invalid(String),
    /// The object violates admission policy; reported as the status reason
    Rejected(String),
}

impl Denial {
    /// Human-readable text of the denial
    pub fn text(&self) -> &str {
        match self {
            Denial::Invalid(text) | Denial::Rejected(text) => text,
        }
    }
}

/// Outcome of a single admission decision
///
/// `allowed` is always set explicitly by the constructors. A patch can only be
/// attached through [`Decision::patched`], so a non-empty patch always implies
/// an allowed decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    allowed: bool,
    patch: Vec<AnnotationPatch>,
    denial: Option<Denial>,
}

impl Decision {
    /// Allow the object unchanged
    pub fn allow() -> Self {
        Self {
            allowed: true,
            patch: Vec::new(),
            denial: None,
        }
    }

    /// Allow the object with the given JSON Patch operations applied
    pub fn patched(patch: Vec<AnnotationPatch>) -> Self {
        Self {
            allowed: true,
            patch,
            denial: None,
        }
    }

    /// Deny because the target object could not be decoded
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            patch: Vec::new(),
            denial: Some(Denial::Invalid(message.into())),
        }
    }

    /// Deny because the object violates admission policy
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            patch: Vec::new(),
            denial: Some(Denial::Rejected(reason.into())),
        }
    }

    /// Whether the request is admitted
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Patch operations to apply, empty when the object is admitted unchanged
    pub fn patch(&self) -> &[AnnotationPatch] {
        &self.patch
    }

    /// Denial details, if the request was denied
    pub fn denial(&self) -> Option<&Denial> {
        self.denial.as_ref()
    }

    /// Build the wire response for `request`.
    ///
    /// The response carries the request's UID. A patch is serialized as a
    /// JSON Patch document with `patchType: JSONPatch`.
    pub fn into_response<K: Resource>(self, request: &AdmissionRequest<K>) -> AdmissionResponse {
        let response = AdmissionResponse::from(request);

        if let Some(denial) = self.denial {
            let mut denied = response.deny(denial.text());
            if let Denial::Rejected(reason) = denial {
                denied.result.reason = reason;
            }
            return denied;
        }

        if self.patch.is_empty() {
            return response;
        }

        match response.with_patch(to_json_patch(self.patch)) {
            Ok(patched) => patched,
            Err(e) => {
                error!(uid = %request.uid, error = %e, "Failed to serialize patch");
                AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
            }
        }
    }
}
