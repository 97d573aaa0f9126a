#![allow(missing_docs)]
//! Mission instances and the engine that drives them.

pub mod effects;
pub mod engine;
pub mod events;
mod instance;

pub use effects::{EffectKind, EffectOutcome};
pub use engine::{
    AbilityActivation, EngineSettings, MissionEngine, ObjectiveCompletion, PhaseProgress,
    ThreatLevel, TickOutcome, TraceChange,
};
pub use events::{EventLog, EventRecord, MissionEvent};
pub use instance::{
    AbilityState, ActiveEffect, FailureReason, MissionInstance, MissionOutcome, MissionStats,
    MissionStatus, ObjectiveState, MAX_TRACE, MAX_ULTIMATE_CHARGE,
};
