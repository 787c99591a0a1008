//! Controller module for Jira reconciliation
//! This module contains the reconciler, the resource builders it drives,
//! the embedded certificate authority and the status projector.

pub mod normalize;
mod reconciler;
pub mod resources;
pub mod status;
pub mod tls;

pub use normalize::{normalize, Normalized};
pub use reconciler::{run_controller, ControllerState, Outcome, Reconciler};
pub use status::{format_endpoint, project_status, sync_status};
