//! Mission state machine.
//!
//! [`MissionEngine`] owns the static content, the clock and the passive
//! ability RNG, and performs every transition on a [`MissionInstance`].
//! Each command takes the instance by `&mut`, so the caller decides how
//! instances are stored and serialized.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    achievements::{self, MissionSummary},
    clock::{Clock, SystemClock},
    content::{Ability, AbilityKind, AbilitySlot, ContentRegistry, PassiveEffect},
    error::EngineError,
    scoring::{hex_shard_reward, Rank, ScoreBreakdown, ScoreCache, ShardTier, ShardWallet},
};

use super::{
    effects::{self, EffectKind, EffectOutcome},
    events::MissionEvent,
    instance::{
        ActiveEffect, FailureReason, MissionInstance, MissionOutcome, MissionStatus,
        ObjectiveState, MAX_TRACE,
    },
};

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Events retained per instance.
    pub event_log_capacity: usize,
    pub score_cache_capacity: usize,
    pub score_cache_ttl_secs: u64,
    /// Seed for passive-ability draws; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            event_log_capacity: 256,
            score_cache_capacity: 100,
            score_cache_ttl_secs: 60,
            rng_seed: None,
        }
    }
}

/// Coarse reading of the trace meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn from_trace(trace_level: f64) -> Self {
        if trace_level < 25.0 {
            ThreatLevel::Low
        } else if trace_level < 50.0 {
            ThreatLevel::Moderate
        } else if trace_level < 75.0 {
            ThreatLevel::High
        } else {
            ThreatLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Moderate => "MODERATE",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the phase check that follows an objective completion.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseProgress {
    /// Required objectives remain in the current phase.
    Unchanged,
    Advanced { from: u32, to: u32 },
    /// The last phase finished and the mission completed.
    MissionCompleted(MissionOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveCompletion {
    pub objective: ObjectiveState,
    /// Total earned rewards after this objective.
    pub mission_progress: u32,
    pub phase_complete: bool,
    pub progress: PhaseProgress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbilityActivation {
    pub slot: AbilitySlot,
    pub ability: Ability,
    pub effects: EffectOutcome,
    pub target: Option<String>,
    pub trace_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceChange {
    pub blocked: bool,
    /// Amount actually applied after passive reduction.
    pub amount: f64,
    pub new_level: f64,
    pub alarm_triggered: bool,
    pub burned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub status: MissionStatus,
    pub time_remaining: u64,
    pub threat: ThreatLevel,
    /// The deadline passed during this tick.
    pub expired: bool,
}

pub struct MissionEngine {
    content: Arc<ContentRegistry>,
    clock: Arc<dyn Clock>,
    rng: Mutex<SmallRng>,
    settings: EngineSettings,
    scores: ScoreCache,
}

impl MissionEngine {
    pub fn new(
        content: Arc<ContentRegistry>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let scores = ScoreCache::new(
            settings.score_cache_capacity,
            Duration::seconds(i64::try_from(settings.score_cache_ttl_secs).unwrap_or(i64::MAX)),
        );
        Self {
            content,
            clock,
            rng: Mutex::new(rng),
            settings,
            scores,
        }
    }

    /// Engine over the built-in content and the system clock.
    pub fn with_defaults() -> Self {
        Self::new(
            ContentRegistry::builtin(),
            Arc::new(SystemClock),
            EngineSettings::default(),
        )
    }

    pub fn content(&self) -> &Arc<ContentRegistry> {
        &self.content
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn create_mission(
        &self,
        mission_type_id: &str,
        team_id: &str,
        agent_id: &str,
    ) -> Result<MissionInstance, EngineError> {
        let mission = self
            .content
            .mission(mission_type_id)
            .ok_or_else(|| EngineError::InvalidMissionType(mission_type_id.to_string()))?;
        if self.content.agent(agent_id).is_none() {
            return Err(EngineError::InvalidAgent(agent_id.to_string()));
        }

        let now = self.clock.now();
        let mut instance = MissionInstance::new(
            Uuid::new_v4().to_string(),
            mission,
            team_id,
            agent_id,
            now,
            self.settings.event_log_capacity,
        );
        instance.events.push(
            now,
            MissionEvent::MissionStarted {
                mission_type: mission.id.clone(),
                agent: agent_id.to_string(),
            },
        );
        info!(
            mission_id = %instance.id,
            mission_type = %mission.id,
            team_id,
            agent_id,
            "mission created"
        );
        Ok(instance)
    }

    pub fn complete_objective(
        &self,
        instance: &mut MissionInstance,
        objective_id: u32,
    ) -> Result<ObjectiveCompletion, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;

        let objective = instance
            .objective_mut(objective_id)
            .ok_or(EngineError::ObjectiveNotFound(objective_id))?;
        if objective.completed {
            return Err(EngineError::AlreadyCompleted(objective_id));
        }
        if !objective.available {
            return Err(EngineError::NotAvailable(objective_id));
        }
        objective.completed = true;
        objective.completed_at = Some(now);
        let objective = objective.clone();

        let reward = objective.template.reward;
        instance.mission_progress += reward;
        instance.abilities.add_charge(reward);
        if let Some(reduction) = objective.template.threat_reduction {
            instance.trace_level = (instance.trace_level - f64::from(reduction)).max(0.0);
        }
        instance.stats.objectives_completed += 1;
        instance.events.push(
            now,
            MissionEvent::ObjectiveCompleted {
                objective_id,
                reward,
                mission_progress: instance.mission_progress,
            },
        );
        info!(
            mission_id = %instance.id,
            objective_id,
            progress = instance.mission_progress,
            "objective completed"
        );

        let progress = self.advance_phase(instance, now);
        self.scores.invalidate(&instance.id);
        Ok(ObjectiveCompletion {
            objective,
            mission_progress: instance.mission_progress,
            phase_complete: progress != PhaseProgress::Unchanged,
            progress,
        })
    }

    /// Advance the phase if every required objective of the current one is
    /// done. Repeated calls without new completions change nothing.
    pub fn check_phase_completion(&self, instance: &mut MissionInstance) -> PhaseProgress {
        let now = self.clock.now();
        let progress = self.advance_phase(instance, now);
        if progress != PhaseProgress::Unchanged {
            self.scores.invalidate(&instance.id);
        }
        progress
    }

    fn advance_phase(&self, instance: &mut MissionInstance, now: DateTime<Utc>) -> PhaseProgress {
        if !instance.is_active() || !instance.is_phase_complete(instance.current_phase) {
            return PhaseProgress::Unchanged;
        }
        let from = instance.current_phase;
        if from >= instance.last_phase {
            return PhaseProgress::MissionCompleted(self.complete_at(instance, now));
        }

        let to = from + 1;
        instance.current_phase = to;
        for objective in instance
            .objectives
            .iter_mut()
            .filter(|objective| objective.phase_id == to)
        {
            objective.available = true;
        }
        instance.events.push(
            now,
            MissionEvent::PhaseCompleted {
                completed_phase: from,
                next_phase: to,
            },
        );
        info!(mission_id = %instance.id, from, to, "phase advanced");
        PhaseProgress::Advanced { from, to }
    }

    pub fn use_ability(
        &self,
        instance: &mut MissionInstance,
        slot: AbilitySlot,
        target: Option<&str>,
    ) -> Result<AbilityActivation, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;

        if slot == AbilitySlot::Passive {
            return Err(EngineError::InvalidAbility(slot.to_string()));
        }
        let agent = self
            .content
            .agent(&instance.selected_agent)
            .ok_or_else(|| EngineError::InvalidAgent(instance.selected_agent.clone()))?;
        let ability = agent
            .ability(slot)
            .ok_or_else(|| EngineError::InvalidAbility(slot.to_string()))?;

        if let Some(last_used) = instance.abilities.last_used.get(&slot) {
            let remaining_secs = cooldown_remaining(ability, *last_used, now);
            if remaining_secs > 0 {
                debug!(mission_id = %instance.id, ability = %slot, remaining_secs, "ability on cooldown");
                return Err(EngineError::OnCooldown {
                    ability: ability.name.clone(),
                    remaining_secs,
                });
            }
        }
        if ability.kind == AbilityKind::Charge {
            let charge = instance.abilities.ultimate_charge;
            if charge < ability.charge_required {
                return Err(EngineError::InsufficientCharge {
                    charge,
                    required: ability.charge_required,
                });
            }
            instance.abilities.ultimate_charge = 0;
        }

        instance.abilities.last_used.insert(slot, now);
        let (effects, timed) = effects::resolve(ability);
        if effects.trace_reduction > 0.0 {
            instance.trace_level = (instance.trace_level - effects.trace_reduction).max(0.0);
        }
        if effects.hex_shard_created {
            instance.stats.hex_shards_forged += 1;
        }
        if let Some(timed) = timed {
            let secs = i64::try_from(timed.duration_secs).unwrap_or(i64::MAX);
            instance.abilities.register(ActiveEffect {
                kind: timed.kind,
                source: slot,
                start_time: now,
                end_time: now + Duration::seconds(secs),
            });
        }
        instance.stats.abilities_used += 1;
        instance.events.push(
            now,
            MissionEvent::AbilityUsed {
                ability: slot,
                name: ability.name.clone(),
                effects: effects.clone(),
            },
        );
        info!(
            mission_id = %instance.id,
            ability = %slot,
            name = %ability.name,
            trace_level = instance.trace_level,
            "ability used"
        );

        self.scores.invalidate(&instance.id);
        Ok(AbilityActivation {
            slot,
            ability: ability.clone(),
            effects,
            target: target.map(str::to_string),
            trace_level: instance.trace_level,
        })
    }

    /// Seconds until `slot` can be used again, zero when ready.
    pub fn cooldown_remaining(&self, instance: &MissionInstance, slot: AbilitySlot) -> u64 {
        let ability = self
            .content
            .agent(&instance.selected_agent)
            .and_then(|agent| agent.ability(slot));
        match (ability, instance.abilities.last_used.get(&slot)) {
            (Some(ability), Some(last_used)) => {
                cooldown_remaining(ability, *last_used, self.clock.now())
            }
            _ => 0,
        }
    }

    pub fn increase_trace(
        &self,
        instance: &mut MissionInstance,
        amount: f64,
        source: &str,
    ) -> Result<TraceChange, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;
        let change = self.apply_trace(instance, amount, source, now);
        self.scores.invalidate(&instance.id);
        Ok(change)
    }

    fn apply_trace(
        &self,
        instance: &mut MissionInstance,
        amount: f64,
        source: &str,
        now: DateTime<Utc>,
    ) -> TraceChange {
        let mut amount = amount.max(0.0);
        if instance.abilities.has_effect(EffectKind::TraceImmunity, now) {
            instance.stats.traces_blocked += 1;
            instance.events.push(
                now,
                MissionEvent::TraceBlocked {
                    amount,
                    source: source.to_string(),
                },
            );
            debug!(mission_id = %instance.id, amount, source, "trace blocked");
            return TraceChange {
                blocked: true,
                amount: 0.0,
                new_level: instance.trace_level,
                alarm_triggered: false,
                burned: false,
            };
        }

        let passive = self
            .content
            .agent(&instance.selected_agent)
            .map(|agent| agent.passive().effect);
        if let Some(PassiveEffect::FalseTelemetryChance { probability }) = passive {
            if probability > 0.0 && self.rng.lock().gen::<f64>() < probability {
                let reduced = amount / 2.0;
                instance.events.push(
                    now,
                    MissionEvent::FalseTelemetry {
                        original_amount: amount,
                        reduced_amount: reduced,
                    },
                );
                debug!(mission_id = %instance.id, amount, reduced, "false telemetry");
                amount = reduced;
            }
        }

        let previous = instance.trace_level;
        instance.trace_level = (previous + amount).clamp(0.0, MAX_TRACE);
        instance.stats.trace_increases += 1;
        instance.events.push(
            now,
            MissionEvent::TraceIncreased {
                amount,
                source: source.to_string(),
                new_level: instance.trace_level,
            },
        );
        debug!(
            mission_id = %instance.id,
            amount,
            source,
            trace_level = instance.trace_level,
            "trace increased"
        );

        let alarm_triggered = previous < instance.trace_threshold
            && instance.trace_level >= instance.trace_threshold;
        if alarm_triggered {
            self.record_alarm(instance, "trace_threshold", now);
        }
        let burned = instance.trace_level >= MAX_TRACE;
        if burned {
            self.burn(instance, now);
        }
        TraceChange {
            blocked: false,
            amount,
            new_level: instance.trace_level,
            alarm_triggered,
            burned,
        }
    }

    /// Record an alarm raised by the environment. Returns the new total.
    pub fn trigger_alarm(
        &self,
        instance: &mut MissionInstance,
        source: &str,
    ) -> Result<u32, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;
        self.record_alarm(instance, source, now);
        self.scores.invalidate(&instance.id);
        Ok(instance.alarms_triggered)
    }

    fn record_alarm(&self, instance: &mut MissionInstance, source: &str, now: DateTime<Utc>) {
        instance.alarms_triggered += 1;
        instance.events.push(
            now,
            MissionEvent::AlarmTriggered {
                source: source.to_string(),
                total: instance.alarms_triggered,
            },
        );
        warn!(mission_id = %instance.id, source, total = instance.alarms_triggered, "alarm triggered");
    }

    /// Add ultimate charge, capped. Returns the new charge.
    pub fn add_ultimate_charge(
        &self,
        instance: &mut MissionInstance,
        amount: u32,
    ) -> Result<u32, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;
        Ok(instance.abilities.add_charge(amount))
    }

    pub fn engage_backup_tactics(&self, instance: &mut MissionInstance) -> Result<(), EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;
        if !instance.backup_tactics_used {
            instance.backup_tactics_used = true;
            instance
                .events
                .push(now, MissionEvent::BackupTacticsEngaged);
            info!(mission_id = %instance.id, "backup tactics engaged");
        }
        Ok(())
    }

    /// Periodic timer step: purges expired effects and enforces the deadline.
    pub fn tick(&self, instance: &mut MissionInstance) -> TickOutcome {
        let now = self.clock.now();
        let mut expired = false;
        if instance.is_active() {
            instance.abilities.active_effects(now);
            if instance.is_overdue(now) {
                self.fail_at(instance, FailureReason::TimeExpired, now);
                self.scores.invalidate(&instance.id);
                expired = true;
            }
        }
        TickOutcome {
            status: instance.status,
            time_remaining: if instance.is_active() {
                instance.time_remaining(now)
            } else {
                0
            },
            threat: ThreatLevel::from_trace(instance.trace_level),
            expired,
        }
    }

    /// Complete an active mission regardless of outstanding objectives.
    pub fn complete_mission(
        &self,
        instance: &mut MissionInstance,
    ) -> Result<MissionOutcome, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;
        let outcome = self.complete_at(instance, now);
        self.scores.invalidate(&instance.id);
        Ok(outcome)
    }

    fn complete_at(&self, instance: &mut MissionInstance, now: DateTime<Utc>) -> MissionOutcome {
        instance.completed_at = Some(now);
        let breakdown = self.score_at(instance, now);
        let time_used = instance.time_used(now);

        let mut hex_shards = hex_shard_reward(breakdown.rank);
        hex_shards.grant(ShardTier::Common, instance.stats.hex_shards_forged);
        let achievements = achievements::evaluate(&MissionSummary {
            status: MissionStatus::Completed,
            trace_level: instance.trace_level,
            time_used,
            rank: breakdown.rank,
            alarms_triggered: instance.alarms_triggered,
            backup_tactics_used: instance.backup_tactics_used,
            team_hex_shards: None,
        });

        instance.status = MissionStatus::Completed;
        let outcome = MissionOutcome {
            status: MissionStatus::Completed,
            final_score: breakdown.score,
            rank: breakdown.rank,
            time_used,
            breakdown: Some(breakdown),
            hex_shards,
            achievements,
            reason: None,
        };
        instance.outcome = Some(outcome.clone());
        instance.events.push(
            now,
            MissionEvent::MissionCompleted {
                final_score: outcome.final_score,
                rank: outcome.rank,
                time_used,
            },
        );
        info!(
            mission_id = %instance.id,
            score = outcome.final_score,
            rank = %outcome.rank,
            time_used,
            "mission completed"
        );
        outcome
    }

    pub fn fail_mission(
        &self,
        instance: &mut MissionInstance,
        reason: FailureReason,
    ) -> Result<MissionOutcome, EngineError> {
        let now = self.clock.now();
        self.ensure_active(instance, now)?;
        let outcome = self.fail_at(instance, reason, now);
        self.scores.invalidate(&instance.id);
        Ok(outcome)
    }

    fn fail_at(
        &self,
        instance: &mut MissionInstance,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) -> MissionOutcome {
        instance.completed_at = Some(now);
        let breakdown = self.score_at(instance, now);
        let final_score = breakdown.score / 2;

        instance.status = MissionStatus::Failed;
        let outcome = MissionOutcome {
            status: MissionStatus::Failed,
            final_score,
            rank: Rank::F,
            time_used: instance.time_used(now),
            breakdown: Some(breakdown),
            hex_shards: ShardWallet::default(),
            achievements: Vec::new(),
            reason: Some(reason.clone()),
        };
        instance.outcome = Some(outcome.clone());
        instance.events.push(
            now,
            MissionEvent::MissionFailed {
                reason: reason.clone(),
                final_score,
                phase: instance.current_phase,
            },
        );
        warn!(mission_id = %instance.id, %reason, score = final_score, "mission failed");
        outcome
    }

    fn burn(&self, instance: &mut MissionInstance, now: DateTime<Utc>) {
        instance.completed_at = Some(now);
        instance.status = MissionStatus::Burned;
        instance.outcome = Some(MissionOutcome {
            status: MissionStatus::Burned,
            final_score: 0,
            rank: Rank::F,
            time_used: instance.time_used(now),
            breakdown: None,
            hex_shards: ShardWallet::default(),
            achievements: Vec::new(),
            reason: None,
        });
        instance.events.push(
            now,
            MissionEvent::BurnStateTriggered {
                trace_level: instance.trace_level,
                phase: instance.current_phase,
            },
        );
        warn!(mission_id = %instance.id, phase = instance.current_phase, "burn state triggered");
    }

    /// Score of the instance as it stands, measured at completion once terminal.
    pub fn score(&self, instance: &MissionInstance) -> ScoreBreakdown {
        self.score_at(instance, self.clock.now())
    }

    fn score_at(&self, instance: &MissionInstance, now: DateTime<Utc>) -> ScoreBreakdown {
        self.scores
            .get_or_compute(&instance.id, &instance.score_input(now), now)
    }

    pub fn threat_level(&self, instance: &MissionInstance) -> ThreatLevel {
        ThreatLevel::from_trace(instance.trace_level)
    }

    /// Drop memoized scores for an instance.
    pub fn invalidate_scores(&self, mission_id: &str) {
        self.scores.invalidate(mission_id);
    }

    /// Fails an overdue active instance, then rejects anything not active.
    fn ensure_active(
        &self,
        instance: &mut MissionInstance,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if instance.is_active() && instance.is_overdue(now) {
            self.fail_at(instance, FailureReason::TimeExpired, now);
            self.scores.invalidate(&instance.id);
        }
        if !instance.is_active() {
            return Err(EngineError::MissionNotActive {
                status: instance.status,
            });
        }
        Ok(())
    }
}

fn cooldown_remaining(ability: &Ability, last_used: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let cooldown_ms = i64::try_from(ability.cooldown)
        .unwrap_or(i64::MAX / 1000)
        .saturating_mul(1000);
    let elapsed_ms = (now - last_used).num_milliseconds();
    let remaining_ms = cooldown_ms - elapsed_ms;
    if remaining_ms <= 0 {
        0
    } else {
        u64::try_from((remaining_ms + 999) / 1000).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{achievements::AchievementKind, clock::ManualClock, content::Agent};

    fn engine_with(content: Arc<ContentRegistry>) -> (MissionEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = MissionEngine::new(
            content,
            clock.clone(),
            EngineSettings {
                rng_seed: Some(7),
                ..EngineSettings::default()
            },
        );
        (engine, clock)
    }

    fn engine() -> (MissionEngine, Arc<ManualClock>) {
        engine_with(ContentRegistry::builtin())
    }

    fn content_with_passive(probability: f64) -> Arc<ContentRegistry> {
        let builtin = ContentRegistry::builtin();
        let missions = builtin.missions().cloned().collect();
        let agents: Vec<Agent> = builtin
            .agents()
            .cloned()
            .map(|mut agent| {
                if agent.id == "hacker" {
                    agent.abilities.passive.effect =
                        PassiveEffect::FalseTelemetryChance { probability };
                }
                agent
            })
            .collect();
        Arc::new(ContentRegistry::from_parts(missions, agents).unwrap())
    }

    #[test]
    fn unknown_references_are_rejected() {
        let (engine, _) = engine();
        assert_eq!(
            engine.create_mission("NOPE", "team", "hacker").unwrap_err(),
            EngineError::InvalidMissionType("NOPE".into())
        );
        assert_eq!(
            engine
                .create_mission("FALSE_FLAG", "team", "ghost")
                .unwrap_err(),
            EngineError::InvalidAgent("ghost".into())
        );
    }

    #[test]
    fn objective_completion_rejects_repeats_and_locked_objectives() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();

        let first = engine.complete_objective(&mut mission, 1).unwrap();
        assert_eq!(first.mission_progress, 15);
        assert!(!first.phase_complete);
        assert_eq!(
            engine.complete_objective(&mut mission, 1).unwrap_err(),
            EngineError::AlreadyCompleted(1)
        );
        assert_eq!(mission.mission_progress, 15);
        assert_eq!(
            engine.complete_objective(&mut mission, 4).unwrap_err(),
            EngineError::NotAvailable(4)
        );
        assert_eq!(
            engine.complete_objective(&mut mission, 42).unwrap_err(),
            EngineError::ObjectiveNotFound(42)
        );
    }

    #[test]
    fn phases_advance_one_at_a_time() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        engine.complete_objective(&mut mission, 1).unwrap();
        engine.complete_objective(&mut mission, 2).unwrap();
        assert_eq!(mission.current_phase, 1);

        let done = engine.complete_objective(&mut mission, 3).unwrap();
        assert_eq!(done.progress, PhaseProgress::Advanced { from: 1, to: 2 });
        assert_eq!(mission.current_phase, 2);
        assert!(mission.phase_objectives(2).all(|o| o.available));
        assert!(mission.phase_objectives(3).all(|o| !o.available));
        assert_eq!(
            engine.check_phase_completion(&mut mission),
            PhaseProgress::Unchanged
        );
        assert!(mission.events.tags().contains(&"phase_completed"));
    }

    #[test]
    fn half_duration_run_scores_from_formula() {
        let (engine, clock) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        for id in [1, 2, 3, 4, 5, 7, 8] {
            engine.complete_objective(&mut mission, id).unwrap();
        }
        clock.advance_secs(900);
        let last = engine.complete_objective(&mut mission, 9).unwrap();

        let PhaseProgress::MissionCompleted(outcome) = last.progress else {
            panic!("mission should complete on the last required objective");
        };
        assert_eq!(mission.status, MissionStatus::Completed);
        assert_eq!(outcome.time_used, 900);
        assert_eq!(outcome.final_score, 9590);
        assert_eq!(outcome.rank, Rank::S);
        assert_eq!(outcome.hex_shards.legendary, 10);
        assert_eq!(outcome.hex_shards.mythic, 5);
        assert_eq!(
            outcome.achievements,
            vec![
                AchievementKind::GhostOperator,
                AchievementKind::SpeedDemon,
                AchievementKind::PerfectCoordination
            ]
        );
        assert_eq!(mission.outcome.as_ref(), Some(&outcome));
        assert_eq!(
            engine.complete_objective(&mut mission, 6).unwrap_err(),
            EngineError::MissionNotActive {
                status: MissionStatus::Completed
            }
        );
    }

    #[test]
    fn ultimate_requires_full_charge() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        engine.add_ultimate_charge(&mut mission, 50).unwrap();
        assert_eq!(
            engine
                .use_ability(&mut mission, AbilitySlot::Ultimate, None)
                .unwrap_err(),
            EngineError::InsufficientCharge {
                charge: 50,
                required: 100
            }
        );
        assert_eq!(mission.abilities.ultimate_charge, 50);

        engine.add_ultimate_charge(&mut mission, 80).unwrap();
        assert_eq!(mission.abilities.ultimate_charge, 100);
        engine
            .use_ability(&mut mission, AbilitySlot::Ultimate, None)
            .unwrap();
        assert_eq!(mission.abilities.ultimate_charge, 0);
    }

    #[test]
    fn cooldown_reports_remaining_seconds() {
        let (engine, clock) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        engine
            .use_ability(&mut mission, AbilitySlot::Ability1, Some("relay"))
            .unwrap();
        clock.advance_secs(5);
        let err = engine
            .use_ability(&mut mission, AbilitySlot::Ability1, None)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::RateLimited);
        assert_eq!(
            err,
            EngineError::OnCooldown {
                ability: "Ghost Port".into(),
                remaining_secs: 13
            }
        );
        assert_eq!(engine.cooldown_remaining(&mission, AbilitySlot::Ability1), 13);

        clock.advance_secs(13);
        assert!(engine
            .use_ability(&mut mission, AbilitySlot::Ability1, None)
            .is_ok());
        assert_eq!(mission.stats.abilities_used, 2);
    }

    #[test]
    fn passive_slot_is_not_invocable() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        assert_eq!(
            engine
                .use_ability(&mut mission, AbilitySlot::Passive, None)
                .unwrap_err(),
            EngineError::InvalidAbility("passive".into())
        );
    }

    #[test]
    fn deadline_fails_mission_with_half_score() {
        let (engine, clock) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        clock.advance_secs(1801);

        let tick = engine.tick(&mut mission);
        assert!(tick.expired);
        assert_eq!(tick.status, MissionStatus::Failed);
        let outcome = mission.outcome.clone().unwrap();
        let breakdown = outcome.breakdown.unwrap();
        assert_eq!(breakdown.score, 2100);
        assert_eq!(outcome.final_score, 1050);
        assert_eq!(outcome.rank, Rank::F);
        assert_eq!(outcome.reason, Some(FailureReason::TimeExpired));

        let again = engine.tick(&mut mission);
        assert!(!again.expired);
    }

    #[test]
    fn overdue_commands_fail_the_mission_first() {
        let (engine, clock) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        clock.advance_secs(1800);
        assert_eq!(
            engine.complete_objective(&mut mission, 1).unwrap_err(),
            EngineError::MissionNotActive {
                status: MissionStatus::Failed
            }
        );
        assert_eq!(mission.events.tags().last(), Some(&"mission_failed"));
    }

    #[test]
    fn overdue_abandon_records_time_expired() {
        let (engine, clock) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        clock.advance_secs(5000);

        assert_eq!(
            engine
                .fail_mission(&mut mission, FailureReason::Abandoned)
                .unwrap_err(),
            EngineError::MissionNotActive {
                status: MissionStatus::Failed
            }
        );
        let outcome = mission.outcome.clone().unwrap();
        assert_eq!(outcome.reason, Some(FailureReason::TimeExpired));
        assert_eq!(outcome.time_used, 5000);
        assert_eq!(
            mission
                .events
                .tags()
                .iter()
                .filter(|tag| **tag == "mission_failed")
                .count(),
            1
        );
    }

    #[test]
    fn trace_is_clamped_and_burns_at_maximum() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        let change = engine.increase_trace(&mut mission, 150.0, "sweep").unwrap();
        assert_eq!(change.new_level, 100.0);
        assert!(change.burned);
        assert_eq!(mission.status, MissionStatus::Burned);
        let outcome = mission.outcome.as_ref().unwrap();
        assert_eq!(outcome.final_score, 0);
        assert_eq!(outcome.rank, Rank::F);
        assert!(engine.increase_trace(&mut mission, 1.0, "sweep").is_err());
    }

    #[test]
    fn crossing_threshold_raises_one_alarm() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        assert!(!engine.increase_trace(&mut mission, 20.0, "camera").unwrap().alarm_triggered);
        assert!(engine.increase_trace(&mut mission, 10.0, "camera").unwrap().alarm_triggered);
        assert!(!engine.increase_trace(&mut mission, 10.0, "camera").unwrap().alarm_triggered);
        assert_eq!(mission.alarms_triggered, 1);
        assert_eq!(engine.threat_level(&mission), ThreatLevel::Moderate);
    }

    #[test]
    fn immunity_window_blocks_trace_until_expiry() {
        let (engine, clock) = engine_with(content_with_passive(0.0));
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        engine.increase_trace(&mut mission, 20.0, "patrol").unwrap();
        engine.add_ultimate_charge(&mut mission, 100).unwrap();
        let activation = engine
            .use_ability(&mut mission, AbilitySlot::Ultimate, None)
            .unwrap();
        assert_eq!(activation.trace_level, 5.0);

        let blocked = engine.increase_trace(&mut mission, 30.0, "patrol").unwrap();
        assert!(blocked.blocked);
        assert_eq!(blocked.amount, 0.0);
        assert_eq!(mission.trace_level, 5.0);

        clock.advance_secs(6);
        let applied = engine.increase_trace(&mut mission, 30.0, "patrol").unwrap();
        assert!(!applied.blocked);
        assert_eq!(mission.trace_level, 35.0);
    }

    #[test]
    fn false_telemetry_halves_increase() {
        let (engine, _) = engine_with(content_with_passive(1.0));
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        let change = engine.increase_trace(&mut mission, 15.0, "scan").unwrap();
        assert_eq!(change.amount, 7.5);
        assert_eq!(mission.trace_level, 7.5);
        assert!(mission.events.tags().contains(&"false_telemetry"));
    }

    #[test]
    fn objective_threat_reduction_and_forged_shards() {
        let (engine, _) = engine();
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "infiltrator")
            .unwrap();
        engine.increase_trace(&mut mission, 6.0, "door").unwrap();
        engine.complete_objective(&mut mission, 2).unwrap();
        assert_eq!(mission.trace_level, 0.0);

        let (engine, _) = engine_with(content_with_passive(0.0));
        let mut mission = engine
            .create_mission("FALSE_FLAG", "team", "hacker")
            .unwrap();
        engine
            .use_ability(&mut mission, AbilitySlot::Ability2, None)
            .unwrap();
        engine.trigger_alarm(&mut mission, "guard").unwrap();
        engine.increase_trace(&mut mission, 60.0, "guard").unwrap();
        let outcome = engine.complete_mission(&mut mission).unwrap();
        assert_eq!(outcome.rank, Rank::F);
        assert_eq!(outcome.hex_shards.common, 1);
    }

    #[test]
    fn score_is_reproducible() {
        let (engine, clock) = engine();
        let mut mission = engine
            .create_mission("CORE_EXTRACTION", "team", "infiltrator")
            .unwrap();
        engine.increase_trace(&mut mission, 12.0, "scan").unwrap();
        clock.advance_secs(300);
        let first = engine.score(&mission);
        let second = engine.score(&mission);
        assert_eq!(first, second);
        assert_eq!(
            first,
            crate::scoring::calculate_score(&mission.score_input(clock.now()))
        );
    }

    #[test]
    fn threat_bands() {
        assert_eq!(ThreatLevel::from_trace(24.9), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_trace(25.0), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_trace(74.0), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_trace(75.0), ThreatLevel::Critical);
    }
}
