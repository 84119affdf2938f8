//! Approval error types.
//!
//! `ApprovalError` is the single error of the approval engine. Store
//! backends report `StoreError`, which converts into it.

use attest_shared::AppError;
use attest_shared::types::{ApprovalLevelId, OptionGroupSetId, WorkflowId};
use thiserror::Error;

use super::deletion::PreDeleteCheck;
use super::types::{ApprovalAction, ApprovalKey};

/// Errors reported by an approval store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An approval with the same key already exists.
    #[error("Approval already exists: {0}")]
    Conflict(ApprovalKey),

    /// No approval exists for the key.
    #[error("Approval not found: {0}")]
    NotFound(ApprovalKey),

    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors that can occur during approval operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The batch may not be approved.
    #[error("May not approve: {reason}")]
    MayNotApprove {
        /// Why the first failing item was rejected.
        reason: String,
    },

    /// The batch may not be unapproved.
    #[error("May not unapprove: {reason}")]
    MayNotUnapprove {
        /// Why the first failing item was rejected.
        reason: String,
    },

    /// The batch may not be accepted.
    #[error("May not accept: {reason}")]
    MayNotAccept {
        /// Why the first failing item was rejected.
        reason: String,
    },

    /// The batch may not be unaccepted.
    #[error("May not unaccept: {reason}")]
    MayNotUnaccept {
        /// Why the first failing item was rejected.
        reason: String,
    },

    /// An approval to mutate does not exist.
    #[error("Approval not found: {0}")]
    NotFound(ApprovalKey),

    /// A concurrent writer persisted the same approval first.
    #[error("Approval already exists: {0}")]
    Conflict(ApprovalKey),

    /// A level with the same depth and group set already exists.
    #[error("Approval level already exists at depth {depth}")]
    DuplicateLevel {
        /// Organisational depth.
        depth: u32,
        /// Group set restriction.
        group_set: Option<OptionGroupSetId>,
    },

    /// Level not found.
    #[error("Approval level {0} not found")]
    LevelNotFound(ApprovalLevelId),

    /// Level number is out of range or breaks the level ordering.
    #[error("Invalid approval level position {level}")]
    InvalidLevelPosition {
        /// Requested level number.
        level: u32,
    },

    /// The level cannot be moved in the requested direction.
    #[error("Approval level {level} cannot be moved")]
    CannotMoveLevel {
        /// Level number.
        level: u32,
    },

    /// Workflow not found.
    #[error("Workflow {0} not found")]
    WorkflowNotFound(WorkflowId),

    /// A pre-delete check vetoed a deletion.
    #[error("Deletion vetoed by {check}: {reason}")]
    DeletionVetoed {
        /// The vetoing check.
        check: PreDeleteCheck,
        /// Why the deletion was vetoed.
        reason: String,
    },

    /// Store backend failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl ApprovalError {
    /// Builds the may-not error matching an action.
    #[must_use]
    pub fn may_not(action: ApprovalAction, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match action {
            ApprovalAction::Approve => Self::MayNotApprove { reason },
            ApprovalAction::Unapprove => Self::MayNotUnapprove { reason },
            ApprovalAction::Accept => Self::MayNotAccept { reason },
            ApprovalAction::Unaccept => Self::MayNotUnaccept { reason },
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidLevelPosition { .. } | Self::CannotMoveLevel { .. } => 400,

            Self::MayNotApprove { .. }
            | Self::MayNotUnapprove { .. }
            | Self::MayNotAccept { .. }
            | Self::MayNotUnaccept { .. } => 403,

            Self::NotFound(_) | Self::LevelNotFound(_) | Self::WorkflowNotFound(_) => 404,

            Self::Conflict(_) | Self::DuplicateLevel { .. } | Self::DeletionVetoed { .. } => 409,

            Self::Store(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MayNotApprove { .. } => "MAY_NOT_APPROVE",
            Self::MayNotUnapprove { .. } => "MAY_NOT_UNAPPROVE",
            Self::MayNotAccept { .. } => "MAY_NOT_ACCEPT",
            Self::MayNotUnaccept { .. } => "MAY_NOT_UNACCEPT",
            Self::NotFound(_) => "APPROVAL_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::DuplicateLevel { .. } => "DUPLICATE_LEVEL",
            Self::LevelNotFound(_) => "LEVEL_NOT_FOUND",
            Self::InvalidLevelPosition { .. } => "INVALID_LEVEL_POSITION",
            Self::CannotMoveLevel { .. } => "CANNOT_MOVE_LEVEL",
            Self::WorkflowNotFound(_) => "WORKFLOW_NOT_FOUND",
            Self::DeletionVetoed { .. } => "DELETION_VETOED",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<StoreError> for ApprovalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(key) => Self::Conflict(key),
            StoreError::NotFound(key) => Self::NotFound(key),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            400 => Self::Validation(message),
            _ => match err {
                ApprovalError::Store(msg) => Self::Storage(msg),
                _ => Self::Internal(message),
            },
        }
    }
}
