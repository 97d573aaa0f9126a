#![allow(missing_docs)]
//! Mutable per-playthrough mission state.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    achievements::AchievementKind,
    content::{AbilitySlot, MissionType, ObjectiveTemplate},
    scoring::{Rank, ScoreBreakdown, ScoreInput, ShardWallet},
};

use super::{effects::EffectKind, events::EventLog};

/// Upper bound of the ultimate charge meter.
pub const MAX_ULTIMATE_CHARGE: u32 = 100;
/// Trace level at which the instance is burned.
pub const MAX_TRACE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Active,
    Completed,
    Failed,
    Burned,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Active => "active",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
            MissionStatus::Burned => "burned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MissionStatus::Active)
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a mission ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FailureReason {
    TimeExpired,
    Abandoned,
    Other(String),
}

impl FailureReason {
    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::TimeExpired => "time_expired",
            FailureReason::Abandoned => "abandoned",
            FailureReason::Other(reason) => reason,
        }
    }
}

impl From<String> for FailureReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "time_expired" => FailureReason::TimeExpired,
            "abandoned" => FailureReason::Abandoned,
            _ => FailureReason::Other(value),
        }
    }
}

impl From<&str> for FailureReason {
    fn from(value: &str) -> Self {
        FailureReason::from(value.to_string())
    }
}

impl From<FailureReason> for String {
    fn from(value: FailureReason) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Objective template materialized onto an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveState {
    #[serde(flatten)]
    pub template: ObjectiveTemplate,
    pub phase_id: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub available: bool,
}

impl ObjectiveState {
    pub fn id(&self) -> u32 {
        self.template.id
    }

    pub fn required(&self) -> bool {
        self.template.required
    }
}

/// Timed effect window registered by an ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub source: AbilitySlot,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ActiveEffect {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.end_time
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityState {
    /// Last activation per ability slot.
    pub last_used: BTreeMap<AbilitySlot, DateTime<Utc>>,
    pub ultimate_charge: u32,
    active_effects: Vec<ActiveEffect>,
}

impl AbilityState {
    /// Drop expired windows and return what is still running.
    pub fn active_effects(&mut self, now: DateTime<Utc>) -> &[ActiveEffect] {
        self.active_effects.retain(|effect| effect.is_active(now));
        &self.active_effects
    }

    /// Whether an effect of `kind` is running, purging expired windows first.
    pub fn has_effect(&mut self, kind: EffectKind, now: DateTime<Utc>) -> bool {
        self.active_effects(now)
            .iter()
            .any(|effect| effect.kind == kind)
    }

    pub fn register(&mut self, effect: ActiveEffect) {
        self.active_effects.push(effect);
    }

    /// Snapshot without purging, for read-only views.
    pub fn effects_snapshot(&self) -> &[ActiveEffect] {
        &self.active_effects
    }

    pub fn add_charge(&mut self, amount: u32) -> u32 {
        self.ultimate_charge = self
            .ultimate_charge
            .saturating_add(amount)
            .min(MAX_ULTIMATE_CHARGE);
        self.ultimate_charge
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStats {
    pub abilities_used: u32,
    pub objectives_completed: u32,
    pub trace_increases: u32,
    pub traces_blocked: u32,
    pub hex_shards_forged: u32,
}

/// Final result persisted on the instance once it is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionOutcome {
    pub status: MissionStatus,
    pub final_score: u64,
    pub rank: Rank,
    pub time_used: u64,
    pub breakdown: Option<ScoreBreakdown>,
    pub hex_shards: ShardWallet,
    pub achievements: Vec<AchievementKind>,
    pub reason: Option<FailureReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionInstance {
    pub id: String,
    pub mission_id: String,
    pub team_id: String,
    pub selected_agent: String,
    pub status: MissionStatus,
    pub current_phase: u32,
    pub last_phase: u32,
    pub duration: u64,
    pub trace_threshold: f64,
    pub trace_level: f64,
    pub objectives: Vec<ObjectiveState>,
    pub abilities: AbilityState,
    pub alarms_triggered: u32,
    pub mission_progress: u32,
    pub backup_tactics_used: bool,
    pub start_time: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: MissionStats,
    pub events: EventLog,
    pub outcome: Option<MissionOutcome>,
    /// Set once the service has credited the outcome to the team.
    #[serde(default)]
    pub settled: bool,
}

impl MissionInstance {
    /// Materialize a fresh instance; phase 1 objectives start available.
    pub fn new(
        id: String,
        mission: &MissionType,
        team_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
        event_capacity: usize,
    ) -> Self {
        let objectives = mission
            .phases
            .iter()
            .flat_map(|phase| {
                phase.objectives.iter().map(move |template| ObjectiveState {
                    template: template.clone(),
                    phase_id: phase.id,
                    completed: false,
                    completed_at: None,
                    available: phase.id == 1,
                })
            })
            .collect();
        let duration = i64::try_from(mission.duration).unwrap_or(i64::MAX);

        Self {
            id,
            mission_id: mission.id.clone(),
            team_id: team_id.to_string(),
            selected_agent: agent_id.to_string(),
            status: MissionStatus::Active,
            current_phase: 1,
            last_phase: mission.last_phase(),
            duration: mission.duration,
            trace_threshold: mission.trace_threshold,
            trace_level: 0.0,
            objectives,
            abilities: AbilityState::default(),
            alarms_triggered: 0,
            mission_progress: 0,
            backup_tactics_used: false,
            start_time: now,
            deadline: now + chrono::Duration::seconds(duration),
            completed_at: None,
            stats: MissionStats::default(),
            events: EventLog::new(event_capacity),
            outcome: None,
            settled: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MissionStatus::Active
    }

    pub fn objective(&self, id: u32) -> Option<&ObjectiveState> {
        self.objectives.iter().find(|objective| objective.id() == id)
    }

    pub fn objective_mut(&mut self, id: u32) -> Option<&mut ObjectiveState> {
        self.objectives
            .iter_mut()
            .find(|objective| objective.id() == id)
    }

    pub fn phase_objectives(&self, phase: u32) -> impl Iterator<Item = &ObjectiveState> {
        self.objectives
            .iter()
            .filter(move |objective| objective.phase_id == phase)
    }

    /// Every required objective of `phase` is done.
    pub fn is_phase_complete(&self, phase: u32) -> bool {
        self.phase_objectives(phase)
            .filter(|objective| objective.required())
            .all(|objective| objective.completed)
    }

    pub fn completed_count(&self) -> usize {
        self.objectives
            .iter()
            .filter(|objective| objective.completed)
            .count()
    }

    pub fn completed_ids(&self) -> Vec<u32> {
        self.objectives
            .iter()
            .filter(|objective| objective.completed)
            .map(ObjectiveState::id)
            .collect()
    }

    /// Whole seconds since start, measured at `now` or at completion.
    pub fn time_used(&self, now: DateTime<Utc>) -> u64 {
        let end = self.completed_at.unwrap_or(now);
        u64::try_from((end - self.start_time).num_seconds()).unwrap_or(0)
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.deadline - now).num_seconds()).unwrap_or(0)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    pub fn score_input(&self, now: DateTime<Utc>) -> ScoreInput {
        ScoreInput {
            trace_level: self.trace_level,
            time_used: self.time_used(now),
            duration: self.duration,
            completed_objectives: self.completed_count(),
            total_objectives: self.objectives.len(),
            alarms_triggered: self.alarms_triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentRegistry;

    fn instance() -> MissionInstance {
        let content = ContentRegistry::builtin();
        let mission = content.mission("FALSE_FLAG").unwrap();
        MissionInstance::new("m1".into(), mission, "team", "hacker", Utc::now(), 16)
    }

    #[test]
    fn new_instance_unlocks_only_first_phase() {
        let mission = instance();
        assert_eq!(mission.objectives.len(), 9);
        assert!(mission
            .objectives
            .iter()
            .all(|objective| objective.available == (objective.phase_id == 1)));
        assert_eq!(mission.current_phase, 1);
        assert_eq!(mission.last_phase, 3);
        assert_eq!(mission.time_remaining(mission.start_time), 1800);
    }

    #[test]
    fn optional_objectives_do_not_block_phase() {
        let mut mission = instance();
        for id in [4, 5] {
            mission.objective_mut(id).unwrap().completed = true;
        }
        assert!(!mission.objective(6).unwrap().required());
        assert!(mission.is_phase_complete(2));
        assert!(!mission.is_phase_complete(1));
    }

    #[test]
    fn expired_effects_are_purged_on_read() {
        let mut abilities = AbilityState::default();
        let now = Utc::now();
        abilities.register(ActiveEffect {
            kind: EffectKind::TraceImmunity,
            source: AbilitySlot::Ultimate,
            start_time: now,
            end_time: now + chrono::Duration::seconds(6),
        });
        assert!(abilities.has_effect(EffectKind::TraceImmunity, now));
        let later = now + chrono::Duration::seconds(6);
        assert!(!abilities.has_effect(EffectKind::TraceImmunity, later));
        assert!(abilities.effects_snapshot().is_empty());
    }

    #[test]
    fn charge_is_capped() {
        let mut abilities = AbilityState::default();
        abilities.add_charge(80);
        assert_eq!(abilities.add_charge(50), MAX_ULTIMATE_CHARGE);
    }

    #[test]
    fn failure_reason_round_trips_as_plain_string() {
        let json = serde_json::to_string(&FailureReason::TimeExpired).unwrap();
        assert_eq!(json, "\"time_expired\"");
        let custom: FailureReason = serde_json::from_str("\"operator_abort\"").unwrap();
        assert_eq!(custom, FailureReason::Other("operator_abort".into()));
    }
}
