use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    content::AbilitySlot,
    scoring::Rank,
};

use super::{effects::EffectOutcome, FailureReason};

/// State transition recorded on a mission instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionEvent {
    MissionStarted {
        mission_type: String,
        agent: String,
    },
    ObjectiveCompleted {
        objective_id: u32,
        reward: u32,
        mission_progress: u32,
    },
    PhaseCompleted {
        completed_phase: u32,
        next_phase: u32,
    },
    AbilityUsed {
        ability: AbilitySlot,
        name: String,
        effects: EffectOutcome,
    },
    TraceBlocked {
        amount: f64,
        source: String,
    },
    FalseTelemetry {
        original_amount: f64,
        reduced_amount: f64,
    },
    TraceIncreased {
        amount: f64,
        source: String,
        new_level: f64,
    },
    AlarmTriggered {
        source: String,
        total: u32,
    },
    BackupTacticsEngaged,
    BurnStateTriggered {
        trace_level: f64,
        phase: u32,
    },
    MissionCompleted {
        final_score: u64,
        rank: Rank,
        time_used: u64,
    },
    MissionFailed {
        reason: FailureReason,
        final_score: u64,
        phase: u32,
    },
}

impl MissionEvent {
    /// Stable tag of the event, matching its serialized `type`.
    pub fn tag(&self) -> &'static str {
        match self {
            MissionEvent::MissionStarted { .. } => "mission_started",
            MissionEvent::ObjectiveCompleted { .. } => "objective_completed",
            MissionEvent::PhaseCompleted { .. } => "phase_completed",
            MissionEvent::AbilityUsed { .. } => "ability_used",
            MissionEvent::TraceBlocked { .. } => "trace_blocked",
            MissionEvent::FalseTelemetry { .. } => "false_telemetry",
            MissionEvent::TraceIncreased { .. } => "trace_increased",
            MissionEvent::AlarmTriggered { .. } => "alarm_triggered",
            MissionEvent::BackupTacticsEngaged => "backup_tactics_engaged",
            MissionEvent::BurnStateTriggered { .. } => "burn_state_triggered",
            MissionEvent::MissionCompleted { .. } => "mission_completed",
            MissionEvent::MissionFailed { .. } => "mission_failed",
        }
    }
}

/// Event with its sequence number and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: MissionEvent,
}

/// Append-only event log bounded to the most recent `capacity` records.
///
/// Sequence numbers keep counting across evictions so consumers can detect
/// gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    next_seq: u64,
    dropped: u64,
    records: VecDeque<EventRecord>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_seq: 0,
            dropped: 0,
            records: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    pub fn push(&mut self, at: DateTime<Utc>, event: MissionEvent) -> u64 {
        if self.records.len() == self.capacity {
            self.records.pop_front();
            self.dropped += 1;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push_back(EventRecord { seq, at, event });
        seq
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Up to `count` most recent records, newest last.
    pub fn latest(&self, count: usize) -> impl Iterator<Item = &EventRecord> {
        let skip = self.records.len().saturating_sub(count);
        self.records.iter().skip(skip)
    }

    /// Tags of retained records in order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.records.iter().map(|record| record.event.tag()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted to respect the bound.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
