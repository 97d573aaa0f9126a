//! Error types reported by the mission engine and its stores.

use thiserror::Error;

use crate::mission::MissionStatus;

/// Coarse error classes used by callers to pick a user-facing treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown mission type, agent, ability, objective or record id.
    InvalidReference,
    /// Operation not allowed in the instance's current state.
    InvalidState,
    /// Ability on cooldown or not charged yet.
    RateLimited,
    /// The persistence collaborator rejected the operation.
    Storage,
}

/// Failures raised by the persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record with the id exists in the collection.
    #[error("{collection} record {id} not found")]
    NotFound {
        /// Collection name.
        collection: &'static str,
        /// Requested id.
        id: String,
    },
    /// A record with the id already exists.
    #[error("{collection} record {id} already exists")]
    Duplicate {
        /// Collection name.
        collection: &'static str,
        /// Conflicting id.
        id: String,
    },
}

/// Errors returned synchronously by engine commands.
#[allow(missing_docs)]
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid mission type '{0}'")]
    InvalidMissionType(String),
    #[error("invalid agent '{0}'")]
    InvalidAgent(String),
    #[error("invalid ability '{0}'")]
    InvalidAbility(String),
    #[error("objective {0} not found")]
    ObjectiveNotFound(u32),
    #[error("mission instance {0} not found")]
    MissionNotFound(String),
    #[error("team {0} not found")]
    TeamNotFound(String),
    #[error("session {0} not found or expired")]
    SessionNotFound(String),
    #[error("objective {0} already completed")]
    AlreadyCompleted(u32),
    #[error("objective {0} not yet available")]
    NotAvailable(u32),
    #[error("mission is not active (status: {status})")]
    MissionNotActive { status: MissionStatus },
    #[error("{ability} on cooldown: {remaining_secs}s remaining")]
    OnCooldown {
        ability: String,
        remaining_secs: u64,
    },
    #[error("insufficient charge: {charge}/{required}")]
    InsufficientCharge { charge: u32, required: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Classify the error for the calling layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidMissionType(_)
            | EngineError::InvalidAgent(_)
            | EngineError::InvalidAbility(_)
            | EngineError::ObjectiveNotFound(_)
            | EngineError::MissionNotFound(_)
            | EngineError::TeamNotFound(_)
            | EngineError::SessionNotFound(_) => ErrorKind::InvalidReference,
            EngineError::AlreadyCompleted(_)
            | EngineError::NotAvailable(_)
            | EngineError::MissionNotActive { .. } => ErrorKind::InvalidState,
            EngineError::OnCooldown { .. } | EngineError::InsufficientCharge { .. } => {
                ErrorKind::RateLimited
            }
            EngineError::Store(_) => ErrorKind::Storage,
        }
    }
}
