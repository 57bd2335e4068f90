//! Deployment admission deciders
//!
//! Deployments owned by a UnitedDeployment are marked on create/update by the
//! mutating endpoint, and the validating endpoint refuses any such Deployment
//! that reaches it without the marker.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use kube::core::admission::Operation;
use tracing::{debug, info, warn};

use crate::codec::Request;
use crate::decision::Decision;
use crate::error::ObjectError;
use crate::patch::synthesize;
use crate::policy::AdmissionPolicy;

/// Status reason returned when a UnitedDeployment-owned Deployment lacks the marker
pub const MISSING_MARKER_REASON: &str = "required annotation are not set";

/// Decide whether a Deployment needs the marker annotation.
///
/// Only CREATE and UPDATE of the workload kind are considered. Deployments
/// owned by the qualifying controller get a patch setting the marker; every
/// other request is allowed unchanged. An undecodable object is denied.
pub fn decide_mutation(policy: &AdmissionPolicy, request: &Request) -> Decision {
    let uid = request.uid.as_str();

    if !matches!(request.operation, Operation::Create | Operation::Update) {
        debug!(
            uid = %uid,
            operation = ?request.operation,
            "Skipping operation that is not create or update"
        );
        return Decision::allow();
    }

    if !policy.is_workload_kind(&request.kind.kind) {
        debug!(
            uid = %uid,
            kind = %request.kind.kind,
            namespace = ?request.namespace,
            name = %request.name,
            "Skipping mutation for unrecognized kind"
        );
        return Decision::allow();
    }

    let deployment = match parse_deployment(request) {
        Ok(d) => d,
        Err(e) => {
            warn!(uid = %uid, error = %e, "Denying deployment that could not be decoded");
            return Decision::invalid(e.to_string());
        }
    };

    if !policy.is_controller_owned(&deployment) {
        debug!(
            uid = %uid,
            namespace = ?request.namespace,
            name = %request.name,
            "Deployment not owned by {}, allowing unchanged",
            policy.controller_kind
        );
        return Decision::allow();
    }

    let additions = BTreeMap::from([(policy.marker_key.clone(), policy.marker_value.clone())]);
    let ops = synthesize(deployment.metadata.annotations.as_ref(), &additions);

    info!(
        uid = %uid,
        namespace = ?request.namespace,
        name = %request.name,
        patch_ops = ops.len(),
        "Marking deployment owned by {}",
        policy.controller_kind
    );

    Decision::patched(ops)
}

/// Decide whether a Deployment satisfies the marker invariant.
///
/// Deployments owned by the qualifying controller must carry the marker
/// annotation; its value is not checked. Everything else is allowed.
pub fn decide_validation(policy: &AdmissionPolicy, request: &Request) -> Decision {
    let uid = request.uid.as_str();

    if !policy.is_workload_kind(&request.kind.kind) {
        debug!(
            uid = %uid,
            kind = %request.kind.kind,
            "Skipping validation for unrecognized kind"
        );
        return Decision::allow();
    }

    let deployment = match parse_deployment(request) {
        Ok(d) => d,
        Err(e) => {
            warn!(uid = %uid, error = %e, "Denying deployment that could not be decoded");
            return Decision::invalid(e.to_string());
        }
    };

    if !policy.is_controller_owned(&deployment) {
        return Decision::allow();
    }

    if !policy.has_marker(&deployment) {
        warn!(
            uid = %uid,
            namespace = ?request.namespace,
            name = %request.name,
            annotation = %policy.marker_key,
            "Rejecting deployment without marker annotation"
        );
        return Decision::reject(MISSING_MARKER_REASON);
    }

    Decision::allow()
}

/// Read the request object as a typed Deployment
fn parse_deployment(request: &Request) -> Result<Deployment, ObjectError> {
    let object = request.object.as_ref().ok_or(ObjectError::Missing)?;
    let value = serde_json::to_value(object)?;
    Ok(serde_json::from_value(value)?)
}
