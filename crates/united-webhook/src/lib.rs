//! UnitedDeployment admission webhook
//!
//! Kubernetes admission webhook that tags Deployments created by a
//! UnitedDeployment controller and refuses such Deployments when the tag is
//! missing.
//!
//! # Architecture
//!
//! ```text
//! API server ──► /mutate   ──► codec ──► mutation decider   ──► patch synthesizer
//!            └─► /validate ──► codec ──► validation decider
//! ```
//!
//! Every request is decided independently from its own contents; nothing is
//! shared between requests except the read-only [`AdmissionPolicy`] and
//! [`EnvelopeCodec`].

#![deny(missing_docs)]

pub mod codec;
pub mod decision;
pub mod error;
pub mod patch;
pub mod policy;
pub mod server;
pub mod telemetry;
pub mod webhook;

pub use codec::EnvelopeCodec;
pub use decision::{Decision, Denial};
pub use error::{DecodeError, ObjectError, ServerError, WebhookError};
pub use policy::AdmissionPolicy;
pub use server::{start_server, ServerConfig};
pub use webhook::{webhook_router, AdmissionPath, WebhookState};
