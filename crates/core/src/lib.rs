#![warn(clippy::all, missing_docs)]

//! Core mission engine for the Nexus heist simulator.
//!
//! This crate hosts the static content registry, the mission state machine
//! and scoring, achievements, the persistence collaborator and the service
//! and timers used by the terminal UI and any future frontends.

pub mod achievements;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod mission;
pub mod scoring;
pub mod service;
pub mod store;
pub mod timers;

pub use achievements::{AchievementKind, MissionSummary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use content::{AbilitySlot, Agent, ContentRegistry, MissionType};
pub use error::{EngineError, ErrorKind, StoreError};
pub use mission::{
    EngineSettings, FailureReason, MissionEngine, MissionInstance, MissionOutcome, MissionStatus,
    ThreatLevel,
};
pub use scoring::{calculate_score, Rank, ScoreBreakdown, ScoreInput, ShardWallet};
pub use service::{
    CleanupReport, GlobalStats, LeaderboardEntry, MissionService, MissionTypeStats, Timeframe,
};
pub use store::{InMemoryStore, Record, Store};
pub use timers::MissionTimer;
