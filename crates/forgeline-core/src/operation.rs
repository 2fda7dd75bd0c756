//! Assembly of long-running operations from execution state.
//!
//! Remote-execution workers call [`assemble`] at each stage transition to
//! produce the [`Operation`] they return to execution-status clients. The
//! functions here are pure: all inputs are passed explicitly, all errors
//! are returned, nothing is logged or retried.

use thiserror::Error;

use crate::digest::InstanceDigest;
use crate::envelope::{self, EnvelopeError};
use crate::wire::{
    operation, ActionResult, ExecuteOperationMetadata, ExecuteResponse, ExecutionStage, Operation,
    RpcStatus, StatusCode,
};

/// Success/failure classification of an execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The execution succeeded.
    Success,
    /// The execution failed.
    Failure {
        /// Status code describing the failure; never [`StatusCode::Ok`].
        code: StatusCode,
        /// Human-readable failure detail.
        message: String,
    },
}

impl ExecutionOutcome {
    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// Returns the status code for this outcome.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::Ok,
            Self::Failure { code, .. } => *code,
        }
    }

    /// Returns the failure message; empty on success.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success => "",
            Self::Failure { message, .. } => message,
        }
    }

    /// Returns `true` for [`ExecutionOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Errors from assembling an operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation metadata could not be encapsulated.
    #[error("failed to encapsulate operation metadata: {0}")]
    Metadata(#[source] EnvelopeError),

    /// The execute response could not be encapsulated.
    #[error("failed to encapsulate execute response: {0}")]
    Response(#[source] EnvelopeError),
}

/// Assembles the long-running operation for one execution stage.
///
/// The resource name depends only on `action`; stage and outcome never
/// change it. `done` is set iff `stage` is [`ExecutionStage::Completed`].
/// When `result` is absent no terminal outcome is attached; when present,
/// the attached [`ExecuteResponse`] carries either the result payload (on
/// success) or the failure message (on failure), never both.
///
/// # Errors
///
/// Returns an error if the metadata or response envelope cannot be
/// encapsulated; no usable operation is returned in that case.
pub fn assemble(
    stage: ExecutionStage,
    action: &InstanceDigest,
    outcome: &ExecutionOutcome,
    result: Option<&ActionResult>,
) -> Result<(String, Operation), OperationError> {
    let name = action.download_resource_name();
    let metadata = envelope::pack(&ExecuteOperationMetadata {
        stage: stage.into(),
        action_digest: Some(action.digest.clone()),
    })
    .map_err(OperationError::Metadata)?;

    let mut operation = Operation {
        name: name.clone(),
        metadata: Some(metadata),
        done: stage == ExecutionStage::Completed,
        result: None,
    };

    if let Some(result) = result {
        let code = outcome.code();
        let mut response = ExecuteResponse {
            result: None,
            status: Some(RpcStatus {
                code: code.into(),
                message: String::new(),
            }),
            message: String::new(),
        };
        if code == StatusCode::Ok {
            response.result = Some(result.clone());
        } else {
            response.message = outcome.message().to_string();
        }
        let payload = envelope::pack(&response).map_err(OperationError::Response)?;
        operation.result = Some(operation::Result::Response(payload));
    }

    Ok((name, operation))
}

/// Assembles an operation for a failure path with no real action result.
///
/// Uses an empty [`ActionResult`] so the returned operation always carries
/// a terminal outcome, e.g. when execution aborted before producing one.
///
/// # Errors
///
/// Propagates any [`assemble`] error.
pub fn assemble_failed(
    stage: ExecutionStage,
    action: &InstanceDigest,
    outcome: &ExecutionOutcome,
) -> Result<Operation, OperationError> {
    let empty = ActionResult::default();
    let (_, operation) = assemble(stage, action, outcome, Some(&empty))?;
    Ok(operation)
}
