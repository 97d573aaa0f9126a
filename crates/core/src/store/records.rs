#![allow(missing_docs)]
//! Records kept by the persistence collaborator.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    achievements::AchievementKind,
    mission::{MissionInstance, MissionOutcome, MissionStatus},
    scoring::{Rank, ShardWallet},
};

use super::Record;

impl Record for MissionInstance {
    const COLLECTION: &'static str = "missions";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub missions_completed: u32,
    pub missions_failed: u32,
    pub total_score: u64,
    pub best_rank: Option<Rank>,
    pub hex_shards: ShardWallet,
    pub xp: u64,
    pub achievements: BTreeSet<AchievementKind>,
}

impl Team {
    pub fn new(id: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            created_at: now,
            last_active: now,
            missions_completed: 0,
            missions_failed: 0,
            total_score: 0,
            best_rank: None,
            hex_shards: ShardWallet::default(),
            xp: 0,
            achievements: BTreeSet::new(),
        }
    }

    pub fn record_rank(&mut self, rank: Rank) {
        let better = self
            .best_rank
            .map_or(true, |best| rank.value() > best.value());
        if better {
            self.best_rank = Some(rank);
        }
    }
}

impl Record for Team {
    const COLLECTION: &'static str = "teams";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One row per terminal mission, keyed by the instance id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceLog {
    pub id: String,
    pub team_id: String,
    pub mission_type: String,
    pub agent: String,
    pub status: MissionStatus,
    pub score: u64,
    pub rank: Rank,
    pub trace_level: f64,
    pub time_used: u64,
    pub completed_objectives: Vec<u32>,
    pub alarms_triggered: u32,
    /// Achievements newly unlocked for the team by this mission.
    #[serde(default)]
    pub achievements_unlocked: Vec<AchievementKind>,
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceLog {
    pub fn from_instance(
        instance: &MissionInstance,
        outcome: &MissionOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: instance.id.clone(),
            team_id: instance.team_id.clone(),
            mission_type: instance.mission_id.clone(),
            agent: instance.selected_agent.clone(),
            status: outcome.status,
            score: outcome.final_score,
            rank: outcome.rank,
            trace_level: instance.trace_level,
            time_used: outcome.time_used,
            completed_objectives: instance.completed_ids(),
            alarms_triggered: instance.alarms_triggered,
            achievements_unlocked: Vec::new(),
            recorded_at: now,
        }
    }
}

impl Record for PerformanceLog {
    const COLLECTION: &'static str = "performance_logs";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub team_id: String,
    pub current_mission: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl Record for Session {
    const COLLECTION: &'static str = "sessions";

    fn id(&self) -> &str {
        &self.id
    }
}
