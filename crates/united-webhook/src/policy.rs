//! Admission policy
//!
//! The fixed set of names the deciders match against. Built once at startup
//! and shared read-only by every request handler.

use k8s_openapi::api::apps::v1::Deployment;

/// Resource kind the webhook mutates and validates
pub const WORKLOAD_KIND: &str = "Deployment";

/// Owner kind that qualifies a Deployment for the marker annotation
pub const CONTROLLER_KIND: &str = "UnitedDeployment";

/// Annotation written by the mutating endpoint and required by the validating one
pub const MARKER_ANNOTATION: &str = "deployment-create-by-uniteddeployment";

/// Value written to [`MARKER_ANNOTATION`]
pub const MARKER_VALUE: &str = "true";

/// Names the deciders use to select and mark resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Kind name of the only resource type that is inspected
    pub workload_kind: String,
    /// Kind name of the owning controller that triggers marking
    pub controller_kind: String,
    /// Marker annotation key
    pub marker_key: String,
    /// Marker annotation value
    pub marker_value: String,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            workload_kind: WORKLOAD_KIND.to_string(),
            controller_kind: CONTROLLER_KIND.to_string(),
            marker_key: MARKER_ANNOTATION.to_string(),
            marker_value: MARKER_VALUE.to_string(),
        }
    }
}

impl AdmissionPolicy {
    /// Whether the admission request targets the recognized workload kind
    pub fn is_workload_kind(&self, kind: &str) -> bool {
        kind == self.workload_kind
    }

    /// Whether any owner reference on the Deployment is the qualifying controller
    pub fn is_controller_owned(&self, deployment: &Deployment) -> bool {
        deployment
            .metadata
            .owner_references
            .as_ref()
            .is_some_and(|owners| owners.iter().any(|o| o.kind == self.controller_kind))
    }

    /// Whether the Deployment carries the marker annotation (any value)
    pub fn has_marker(&self, deployment: &Deployment) -> bool {
        deployment
            .metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(&self.marker_key))
    }
}
