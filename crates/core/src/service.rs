//! Mission service: engine plus stores, teams, sessions and settlement.
//!
//! Every command on an instance runs while holding that instance's lock, so
//! each one is a single read-modify-write against the mission store. The
//! first terminal transition credits the owning team exactly once. Lock
//! entries live only while someone holds or waits on them.

use std::{collections::BTreeMap, collections::HashMap, fmt, str::FromStr, sync::Arc};

use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    achievements::{AchievementKind, MissionSummary},
    clock::Clock,
    config::AppConfig,
    content::{AbilitySlot, ContentRegistry},
    error::{EngineError, StoreError},
    mission::{
        AbilityActivation, FailureReason, MissionEngine, MissionInstance, MissionOutcome,
        MissionStatus, ObjectiveCompletion, TickOutcome, TraceChange,
    },
    scoring::{Rank, ScoreBreakdown},
    store::{InMemoryStore, PerformanceLog, Session, Store, Team},
};

/// Window of performance logs considered by the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Every recorded mission.
    #[default]
    All,
    /// The last 7 days.
    Weekly,
    /// The last 30 days.
    Monthly,
}

impl Timeframe {
    fn window(&self) -> Option<Duration> {
        match self {
            Timeframe::All => None,
            Timeframe::Weekly => Some(Duration::days(7)),
            Timeframe::Monthly => Some(Duration::days(30)),
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Timeframe::All),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            other => Err(format!("unknown timeframe '{other}'")),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Timeframe::All => "all",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        })
    }
}

/// Aggregated standing of one team.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub team_id: String,
    pub team_name: String,
    pub total_score: u64,
    pub missions: usize,
    pub best_score: u64,
    pub average_score: f64,
    pub average_rank: Rank,
}

/// Store-wide counters.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_missions: usize,
    pub completed_missions: usize,
    pub total_teams: usize,
    pub active_sessions: usize,
    /// Percentage of stored instances that completed.
    pub completion_rate: f64,
    /// Agent picked most often, ties broken by id.
    pub most_popular_agent: Option<String>,
}

/// Outcomes of one mission type over the stored instances.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionTypeStats {
    pub mission_type: String,
    pub attempts: usize,
    pub completions: usize,
    pub completion_rate: f64,
    /// Mean final score of completed instances.
    pub average_score: f64,
    /// Mean seconds used by completed instances.
    pub average_duration: f64,
}

/// What a [`MissionService::cleanup`] pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Expired sessions deleted.
    pub sessions_removed: usize,
    /// Settled instances dropped beyond the retention cap.
    pub missions_removed: usize,
}

/// Default number of instances kept by [`MissionService::cleanup`].
pub const DEFAULT_MISSION_RETENTION: usize = 1000;

/// Coordinates the engine with the persistence collaborator.
pub struct MissionService {
    engine: Arc<MissionEngine>,
    missions: Arc<dyn Store<MissionInstance>>,
    teams: Arc<dyn Store<Team>>,
    logs: Arc<dyn Store<PerformanceLog>>,
    sessions: Arc<dyn Store<Session>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    session_ttl: Duration,
    mission_retention: usize,
}

impl MissionService {
    /// Service over in-memory stores.
    pub fn new(engine: Arc<MissionEngine>, session_ttl: Duration) -> Self {
        Self::with_stores(
            engine,
            InMemoryStore::shared(),
            InMemoryStore::shared(),
            InMemoryStore::shared(),
            InMemoryStore::shared(),
            session_ttl,
        )
    }

    /// Service over caller-provided stores.
    pub fn with_stores(
        engine: Arc<MissionEngine>,
        missions: Arc<dyn Store<MissionInstance>>,
        teams: Arc<dyn Store<Team>>,
        logs: Arc<dyn Store<PerformanceLog>>,
        sessions: Arc<dyn Store<Session>>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            engine,
            missions,
            teams,
            logs,
            sessions,
            locks: Mutex::new(HashMap::new()),
            session_ttl,
            mission_retention: DEFAULT_MISSION_RETENTION,
        }
    }

    /// Keep at most `retention` instances through [`cleanup`](Self::cleanup).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.mission_retention = retention;
        self
    }

    /// Build the engine and in-memory service described by `config`.
    pub fn from_config(
        config: &AppConfig,
        content: Arc<ContentRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = MissionEngine::new(content, clock, config.engine.clone());
        let ttl = Duration::minutes(i64::try_from(config.session_ttl_minutes).unwrap_or(i64::MAX));
        Self::new(Arc::new(engine), ttl).with_retention(config.mission_retention)
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<MissionEngine> {
        &self.engine
    }

    /// Create a team with a fresh id.
    pub fn register_team(&self, name: &str) -> Result<Team, EngineError> {
        let team = Team::new(Uuid::new_v4().to_string(), name.trim().to_string(), self.engine.now());
        let team = self.teams.create(team)?;
        info!(team_id = %team.id, name = %team.name, "team registered");
        Ok(team)
    }

    /// Fetch a team.
    pub fn team(&self, team_id: &str) -> Result<Team, EngineError> {
        self.teams
            .get(team_id)
            .map_err(|_| EngineError::TeamNotFound(team_id.to_string()))
    }

    /// Open a session for an existing team.
    pub fn open_session(&self, team_id: &str) -> Result<Session, EngineError> {
        let now = self.engine.now();
        self.teams
            .update(team_id, &mut |team| team.last_active = now)
            .map_err(|_| EngineError::TeamNotFound(team_id.to_string()))?;
        let session = self.sessions.create(Session {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            current_mission: None,
            created_at: now,
            expires_at: now + self.session_ttl,
        })?;
        info!(session_id = %session.id, team_id, "session opened");
        Ok(session)
    }

    /// Fetch a live session. Expired sessions are removed and reported missing.
    pub fn session(&self, session_id: &str) -> Result<Session, EngineError> {
        let missing = || EngineError::SessionNotFound(session_id.to_string());
        let session = self.sessions.get(session_id).map_err(|_| missing())?;
        if session.is_expired(self.engine.now()) {
            // Already removed by a concurrent reader is fine.
            let _ = self.sessions.remove(session_id);
            info!(session_id, "session expired");
            return Err(missing());
        }
        Ok(session)
    }

    /// Start a mission as the session's current one, abandoning any active
    /// predecessor.
    pub fn start_mission(
        &self,
        session_id: &str,
        mission_type_id: &str,
        agent_id: &str,
    ) -> Result<MissionInstance, EngineError> {
        self.with_lock(session_id, || {
            self.start_mission_locked(session_id, mission_type_id, agent_id)
        })
    }

    fn start_mission_locked(
        &self,
        session_id: &str,
        mission_type_id: &str,
        agent_id: &str,
    ) -> Result<MissionInstance, EngineError> {
        let session = self.session(session_id)?;
        let instance = self
            .engine
            .create_mission(mission_type_id, &session.team_id, agent_id)?;

        if let Some(previous) = session.current_mission.as_deref() {
            let abandoned = self.with_instance(previous, |engine, instance| {
                if instance.is_active() {
                    // An overdue predecessor expires instead.
                    match engine.fail_mission(instance, FailureReason::Abandoned) {
                        Ok(_) | Err(EngineError::MissionNotActive { .. }) => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(())
            });
            match abandoned {
                Ok(()) | Err(EngineError::MissionNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        let instance = self.missions.create(instance)?;
        let mission_id = instance.id.clone();
        self.sessions
            .update(session_id, &mut |session| {
                session.current_mission = Some(mission_id.clone())
            })
            .map_err(|_| EngineError::SessionNotFound(session_id.to_string()))?;
        info!(session_id, mission_id = %instance.id, "mission started");
        Ok(instance)
    }

    /// Fetch an instance by id.
    pub fn mission(&self, mission_id: &str) -> Result<MissionInstance, EngineError> {
        self.missions.get(mission_id).map_err(|err| match err {
            StoreError::NotFound { .. } => EngineError::MissionNotFound(mission_id.to_string()),
            other => other.into(),
        })
    }

    /// The session's current instance, if any. An instance dropped by
    /// [`cleanup`](Self::cleanup) reads as none.
    pub fn current_mission(&self, session_id: &str) -> Result<Option<MissionInstance>, EngineError> {
        let session = self.session(session_id)?;
        let Some(id) = session.current_mission else {
            return Ok(None);
        };
        match self.mission(&id) {
            Ok(instance) => Ok(Some(instance)),
            Err(EngineError::MissionNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Complete an objective on an instance.
    pub fn complete_objective(
        &self,
        mission_id: &str,
        objective_id: u32,
    ) -> Result<ObjectiveCompletion, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.complete_objective(instance, objective_id)
        })
    }

    /// Invoke an agent ability on an instance.
    pub fn use_ability(
        &self,
        mission_id: &str,
        slot: AbilitySlot,
        target: Option<&str>,
    ) -> Result<AbilityActivation, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.use_ability(instance, slot, target)
        })
    }

    /// Raise the trace meter of an instance.
    pub fn increase_trace(
        &self,
        mission_id: &str,
        amount: f64,
        source: &str,
    ) -> Result<TraceChange, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.increase_trace(instance, amount, source)
        })
    }

    /// Record an alarm on an instance.
    pub fn trigger_alarm(&self, mission_id: &str, source: &str) -> Result<u32, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.trigger_alarm(instance, source)
        })
    }

    /// Add ultimate charge to an instance.
    pub fn add_ultimate_charge(&self, mission_id: &str, amount: u32) -> Result<u32, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.add_ultimate_charge(instance, amount)
        })
    }

    /// Flag the instance as having used backup tactics.
    pub fn engage_backup_tactics(&self, mission_id: &str) -> Result<(), EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.engage_backup_tactics(instance)
        })
    }

    /// Timer step for an instance.
    pub fn tick(&self, mission_id: &str) -> Result<TickOutcome, EngineError> {
        self.with_instance(mission_id, |engine, instance| Ok(engine.tick(instance)))
    }

    /// Complete an active instance now.
    pub fn complete_mission(&self, mission_id: &str) -> Result<MissionOutcome, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.complete_mission(instance)
        })
    }

    /// Fail an active instance with `reason`.
    pub fn fail_mission(
        &self,
        mission_id: &str,
        reason: FailureReason,
    ) -> Result<MissionOutcome, EngineError> {
        self.with_instance(mission_id, |engine, instance| {
            engine.fail_mission(instance, reason)
        })
    }

    /// Current score of an instance.
    pub fn score(&self, mission_id: &str) -> Result<ScoreBreakdown, EngineError> {
        let instance = self.mission(mission_id)?;
        Ok(self.engine.score(&instance))
    }

    /// Performance logs recorded for a team, oldest first.
    pub fn performance_logs(&self, team_id: &str) -> Vec<PerformanceLog> {
        let mut logs: Vec<_> = self
            .logs
            .list()
            .into_iter()
            .filter(|log| log.team_id == team_id)
            .collect();
        logs.sort_by_key(|log| log.recorded_at);
        logs
    }

    /// Teams ranked by total score over the timeframe.
    pub fn leaderboard(&self, limit: usize, timeframe: Timeframe) -> Vec<LeaderboardEntry> {
        let cutoff = timeframe.window().map(|window| self.engine.now() - window);
        let mut grouped: BTreeMap<String, Vec<PerformanceLog>> = BTreeMap::new();
        for log in self.logs.list() {
            if cutoff.is_some_and(|cutoff| log.recorded_at < cutoff) {
                continue;
            }
            grouped.entry(log.team_id.clone()).or_default().push(log);
        }

        let mut entries: Vec<LeaderboardEntry> = grouped
            .into_iter()
            .map(|(team_id, logs)| {
                let total_score: u64 = logs.iter().map(|log| log.score).sum();
                let best_score = logs.iter().map(|log| log.score).max().unwrap_or(0);
                let ranks: Vec<Rank> = logs.iter().map(|log| log.rank).collect();
                let team_name = self
                    .teams
                    .get(&team_id)
                    .map(|team| team.name)
                    .unwrap_or_else(|_| team_id.clone());
                LeaderboardEntry {
                    team_name,
                    total_score,
                    missions: logs.len(),
                    best_score,
                    average_score: total_score as f64 / logs.len() as f64,
                    average_rank: Rank::average(&ranks),
                    team_id,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });
        entries.truncate(limit);
        entries
    }

    /// Store-wide counters over teams, sessions and stored instances.
    pub fn global_stats(&self) -> GlobalStats {
        let now = self.engine.now();
        let missions = self.missions.list();
        let completed_missions = missions
            .iter()
            .filter(|instance| instance.status == MissionStatus::Completed)
            .count();
        let mut picks: BTreeMap<&str, usize> = BTreeMap::new();
        for instance in &missions {
            *picks.entry(instance.selected_agent.as_str()).or_default() += 1;
        }
        let most_popular_agent = picks
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(agent, _)| agent.to_string());
        let active_sessions = self
            .sessions
            .list()
            .iter()
            .filter(|session| !session.is_expired(now))
            .count();

        GlobalStats {
            total_missions: missions.len(),
            completed_missions,
            total_teams: self.teams.list().len(),
            active_sessions,
            completion_rate: percentage(completed_missions, missions.len()),
            most_popular_agent,
        }
    }

    /// Per mission type outcomes, one entry per known type ordered by id.
    pub fn mission_stats(&self) -> Vec<MissionTypeStats> {
        let missions = self.missions.list();
        self.engine
            .content()
            .missions()
            .map(|mission_type| {
                let attempts: Vec<&MissionInstance> = missions
                    .iter()
                    .filter(|instance| instance.mission_id == mission_type.id)
                    .collect();
                let completed: Vec<&MissionOutcome> = attempts
                    .iter()
                    .copied()
                    .filter(|instance| instance.status == MissionStatus::Completed)
                    .filter_map(|instance| instance.outcome.as_ref())
                    .collect();
                let mean = |value: fn(&MissionOutcome) -> u64| {
                    if completed.is_empty() {
                        0.0
                    } else {
                        completed.iter().map(|&outcome| value(outcome)).sum::<u64>() as f64
                            / completed.len() as f64
                    }
                };
                MissionTypeStats {
                    mission_type: mission_type.id.clone(),
                    attempts: attempts.len(),
                    completions: completed.len(),
                    completion_rate: percentage(completed.len(), attempts.len()),
                    average_score: mean(|outcome| outcome.final_score),
                    average_duration: mean(|outcome| outcome.time_used),
                }
            })
            .collect()
    }

    /// Delete expired sessions and drop the oldest settled instances beyond
    /// the retention cap. Active or unsettled instances are never dropped.
    pub fn cleanup(&self) -> CleanupReport {
        let now = self.engine.now();
        let mut report = CleanupReport::default();
        for session in self.sessions.list() {
            if session.is_expired(now) && self.sessions.remove(&session.id).is_ok() {
                report.sessions_removed += 1;
            }
        }

        let mut missions = self.missions.list();
        if missions.len() > self.mission_retention {
            missions.sort_by(|a, b| {
                b.start_time
                    .cmp(&a.start_time)
                    .then_with(|| a.id.cmp(&b.id))
            });
            for instance in missions.iter().skip(self.mission_retention) {
                if instance.settled && self.missions.remove(&instance.id).is_ok() {
                    report.missions_removed += 1;
                }
            }
        }
        info!(
            sessions_removed = report.sessions_removed,
            missions_removed = report.missions_removed,
            "store cleanup"
        );
        report
    }

    /// Run `op` holding the lock for `id`, then drop the entry if idle.
    ///
    /// Entries are only cloned under the map lock, so a count of one there
    /// means nobody holds or waits on it.
    fn with_lock<R>(&self, id: &str, op: impl FnOnce() -> R) -> R {
        let lock = self
            .locks
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock();
            op()
        };
        drop(lock);

        let mut locks = self.locks.lock();
        if locks
            .get(id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(id);
        }
        result
    }

    /// Run `op` against the stored instance under its lock, then persist it.
    ///
    /// The instance is written back even when `op` fails because the entry
    /// deadline check may have failed it. A settlement that cannot finish is
    /// logged and retried by the next command on the instance.
    fn with_instance<R>(
        &self,
        mission_id: &str,
        op: impl FnOnce(&MissionEngine, &mut MissionInstance) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        self.with_lock(mission_id, || {
            let mut instance = self.mission(mission_id)?;
            let result = op(&self.engine, &mut instance);
            if instance.status.is_terminal() && !instance.settled {
                if let Err(err) = self.settle(&mut instance) {
                    warn!(
                        mission_id,
                        team_id = %instance.team_id,
                        "settlement deferred: {err}"
                    );
                }
            }
            self.missions
                .update(mission_id, &mut |stored| *stored = instance.clone())?;
            result
        })
    }

    /// Credit the team, then record the performance log. The log id is the
    /// instance id, so an existing log means the team was already credited.
    fn settle(&self, instance: &mut MissionInstance) -> Result<(), EngineError> {
        let Some(outcome) = instance.outcome.clone() else {
            return Ok(());
        };
        if self.logs.get(&instance.id).is_ok() {
            instance.settled = true;
            return Ok(());
        }
        let now = self.engine.now();

        let mut unlocked = Vec::new();
        let team = self
            .teams
            .update(&instance.team_id, &mut |team| {
                team.last_active = now;
                if outcome.status == MissionStatus::Completed {
                    team.missions_completed += 1;
                } else {
                    team.missions_failed += 1;
                }
                team.total_score += outcome.final_score;
                team.record_rank(outcome.rank);
                team.hex_shards.add(&outcome.hex_shards);
                for kind in &outcome.achievements {
                    unlock(team, *kind, &mut unlocked);
                }
                if outcome.status == MissionStatus::Completed {
                    let summary = MissionSummary {
                        status: outcome.status,
                        trace_level: instance.trace_level,
                        time_used: outcome.time_used,
                        rank: outcome.rank,
                        alarms_triggered: instance.alarms_triggered,
                        backup_tactics_used: instance.backup_tactics_used,
                        team_hex_shards: Some(team.hex_shards.total()),
                    };
                    if AchievementKind::DataHoarder.is_met(&summary) {
                        unlock(team, AchievementKind::DataHoarder, &mut unlocked);
                    }
                }
            })
            .map_err(|_| EngineError::TeamNotFound(instance.team_id.clone()))?;

        let mut log = PerformanceLog::from_instance(instance, &outcome, now);
        log.achievements_unlocked = unlocked.clone();
        self.logs.create(log)?;
        instance.settled = true;
        info!(
            mission_id = %instance.id,
            team_id = %team.id,
            status = %outcome.status,
            score = outcome.final_score,
            unlocked = unlocked.len(),
            "mission settled"
        );
        Ok(())
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn unlock(team: &mut Team, kind: AchievementKind, unlocked: &mut Vec<AchievementKind>) {
    if team.achievements.insert(kind) {
        let reward = kind.reward();
        team.hex_shards.add(&reward.hex_shards);
        team.xp += reward.xp;
        unlocked.push(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, mission::EngineSettings};
    use chrono::Utc;

    fn service() -> (MissionService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = MissionEngine::new(
            ContentRegistry::builtin(),
            clock.clone(),
            EngineSettings {
                rng_seed: Some(11),
                ..EngineSettings::default()
            },
        );
        (
            MissionService::new(Arc::new(engine), Duration::minutes(120)),
            clock,
        )
    }

    fn session(service: &MissionService, name: &str) -> (Team, Session) {
        let team = service.register_team(name).unwrap();
        let session = service.open_session(&team.id).unwrap();
        (team, session)
    }

    #[test]
    fn completion_is_settled_once() {
        let (service, _) = service();
        let (team, session) = session(&service, "Night Shift");
        let mission = service
            .start_mission(&session.id, "FALSE_FLAG", "infiltrator")
            .unwrap();

        let outcome = service.complete_mission(&mission.id).unwrap();
        assert_eq!(outcome.final_score, 6900);
        assert_eq!(outcome.rank, Rank::S);
        assert!(service.complete_mission(&mission.id).is_err());
        assert!(service.tick(&mission.id).is_ok());

        let team = service.team(&team.id).unwrap();
        assert_eq!(team.missions_completed, 1);
        assert_eq!(team.total_score, 6900);
        assert_eq!(team.best_rank, Some(Rank::S));
        assert_eq!(team.xp, 3750);
        assert_eq!(team.hex_shards.legendary, 12);
        assert_eq!(team.hex_shards.mythic, 6);
        assert_eq!(team.hex_shards.rare, 3);

        let logs = service.performance_logs(&team.id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].achievements_unlocked.len(), 3);
        assert!(service.mission(&mission.id).unwrap().settled);
    }

    #[test]
    fn achievements_unlock_once_and_data_hoarder_uses_team_totals() {
        let (service, _) = service();
        let (team, session) = session(&service, "Hoarders");
        for _ in 0..7 {
            let mission = service
                .start_mission(&session.id, "FALSE_FLAG", "infiltrator")
                .unwrap();
            service.complete_mission(&mission.id).unwrap();
        }
        let team = service.team(&team.id).unwrap();
        assert_eq!(team.missions_completed, 7);
        assert_eq!(team.achievements.len(), 4);
        assert!(team.achievements.contains(&AchievementKind::DataHoarder));
        assert_eq!(team.xp, 4250);
        assert_eq!(team.hex_shards.total(), 112);
    }

    #[test]
    fn new_mission_abandons_active_one() {
        let (service, _) = service();
        let (team, session) = session(&service, "Switchers");
        let first = service
            .start_mission(&session.id, "FALSE_FLAG", "hacker")
            .unwrap();
        let second = service
            .start_mission(&session.id, "CORE_EXTRACTION", "hacker")
            .unwrap();

        let first = service.mission(&first.id).unwrap();
        assert_eq!(first.status, MissionStatus::Failed);
        assert_eq!(
            first.outcome.unwrap().reason,
            Some(FailureReason::Abandoned)
        );
        let current = service.current_mission(&session.id).unwrap().unwrap();
        assert_eq!(current.id, second.id);
        assert_eq!(service.team(&team.id).unwrap().missions_failed, 1);
    }

    #[test]
    fn overdue_predecessor_expires_on_new_start() {
        let (service, clock) = service();
        let (_, session) = session(&service, "Stragglers");
        let first = service
            .start_mission(&session.id, "FALSE_FLAG", "hacker")
            .unwrap();
        clock.advance_secs(1900);
        service
            .start_mission(&session.id, "FALSE_FLAG", "hacker")
            .unwrap();

        let first = service.mission(&first.id).unwrap();
        assert!(first.settled);
        assert_eq!(
            first.outcome.unwrap().reason,
            Some(FailureReason::TimeExpired)
        );
    }

    #[test]
    fn settlement_waits_for_the_team() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = MissionEngine::new(ContentRegistry::builtin(), clock, EngineSettings::default());
        let teams = InMemoryStore::<Team>::shared();
        let service = MissionService::with_stores(
            Arc::new(engine),
            InMemoryStore::shared(),
            teams.clone(),
            InMemoryStore::shared(),
            InMemoryStore::shared(),
            Duration::minutes(120),
        );
        let (team, session) = session(&service, "Ghosts");
        let mission = service
            .start_mission(&session.id, "FALSE_FLAG", "infiltrator")
            .unwrap();
        let team = teams.remove(&team.id).unwrap();

        let outcome = service.complete_mission(&mission.id).unwrap();
        assert_eq!(outcome.final_score, 6900);
        assert!(!service.mission(&mission.id).unwrap().settled);
        assert!(service.performance_logs(&team.id).is_empty());

        teams.create(team.clone()).unwrap();
        service.tick(&mission.id).unwrap();
        assert!(service.mission(&mission.id).unwrap().settled);
        assert_eq!(service.team(&team.id).unwrap().total_score, 6900);
        let logs = service.performance_logs(&team.id);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].achievements_unlocked.len(), 3);
    }

    #[test]
    fn idle_locks_are_released() {
        let (service, _) = service();
        for n in 0..20 {
            let (_, session) = session(&service, &format!("Crew {n}"));
            let mission = service
                .start_mission(&session.id, "FALSE_FLAG", "infiltrator")
                .unwrap();
            service.complete_objective(&mission.id, 1).unwrap();
            service.complete_mission(&mission.id).unwrap();
        }
        assert!(service.locks.lock().is_empty());
    }

    #[test]
    fn cleanup_sweeps_sessions_and_old_missions() {
        let (service, clock) = service();
        let service = service.with_retention(2);
        let (team, session) = session(&service, "Archivists");
        let mut ids = Vec::new();
        for _ in 0..4 {
            let mission = service
                .start_mission(&session.id, "FALSE_FLAG", "hacker")
                .unwrap();
            ids.push(mission.id);
            clock.advance_secs(1);
        }
        service.complete_mission(&ids[3]).unwrap();

        assert_eq!(
            service.cleanup(),
            CleanupReport {
                sessions_removed: 0,
                missions_removed: 2
            }
        );
        assert!(service.mission(&ids[0]).is_err());
        assert!(service.mission(&ids[1]).is_err());
        assert!(service.mission(&ids[2]).is_ok());
        assert_eq!(service.performance_logs(&team.id).len(), 4);

        clock.advance_secs(3 * 3600);
        assert_eq!(service.cleanup().sessions_removed, 1);
        assert_eq!(service.global_stats().active_sessions, 0);
        assert!(service.locks.lock().is_empty());
    }

    #[test]
    fn cleanup_keeps_active_missions() {
        let (service, _) = service();
        let service = service.with_retention(0);
        let (_, session) = session(&service, "Holdouts");
        let mission = service
            .start_mission(&session.id, "CORE_EXTRACTION", "hacker")
            .unwrap();
        assert_eq!(service.cleanup().missions_removed, 0);
        assert!(service.mission(&mission.id).unwrap().is_active());
        assert_eq!(
            service.current_mission(&session.id).unwrap().unwrap().id,
            mission.id
        );
    }

    #[test]
    fn stats_summarise_stored_missions() {
        let (service, clock) = service();
        let (_, session) = session(&service, "Analysts");
        let won = service
            .start_mission(&session.id, "FALSE_FLAG", "infiltrator")
            .unwrap();
        service.complete_mission(&won.id).unwrap();
        service
            .start_mission(&session.id, "FALSE_FLAG", "infiltrator")
            .unwrap();
        service
            .start_mission(&session.id, "BIOMETRIC_BLUFF", "hacker")
            .unwrap();

        let global = service.global_stats();
        assert_eq!(global.total_missions, 3);
        assert_eq!(global.completed_missions, 1);
        assert_eq!(global.total_teams, 1);
        assert_eq!(global.active_sessions, 1);
        assert!((global.completion_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(global.most_popular_agent.as_deref(), Some("infiltrator"));

        let stats = service.mission_stats();
        let ids: Vec<_> = stats.iter().map(|s| s.mission_type.as_str()).collect();
        assert_eq!(ids, vec!["BIOMETRIC_BLUFF", "CORE_EXTRACTION", "FALSE_FLAG"]);
        assert_eq!(stats[0].attempts, 1);
        assert_eq!(stats[0].completions, 0);
        assert_eq!(stats[1].attempts, 0);
        assert_eq!(stats[1].completion_rate, 0.0);
        assert_eq!(stats[2].attempts, 2);
        assert_eq!(stats[2].completions, 1);
        assert_eq!(stats[2].completion_rate, 50.0);
        assert_eq!(stats[2].average_score, 6900.0);
        assert_eq!(stats[2].average_duration, 0.0);

        clock.advance_secs(3 * 3600);
        assert_eq!(service.global_stats().active_sessions, 0);
    }

    #[test]
    fn expired_sessions_are_removed() {
        let (service, clock) = service();
        let (_, session) = session(&service, "Late");
        clock.advance_secs(121 * 60);
        assert_eq!(
            service.session(&session.id).unwrap_err(),
            EngineError::SessionNotFound(session.id.clone())
        );
        assert!(service
            .start_mission(&session.id, "FALSE_FLAG", "hacker")
            .is_err());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let (service, _) = service();
        assert_eq!(
            service.complete_objective("missing", 1).unwrap_err(),
            EngineError::MissionNotFound("missing".into())
        );
        assert_eq!(
            service.open_session("nobody").unwrap_err(),
            EngineError::TeamNotFound("nobody".into())
        );
    }

    #[test]
    fn leaderboard_orders_by_total_score() {
        let (service, clock) = service();
        let (alpha, alpha_session) = session(&service, "Alpha");
        let (beta, beta_session) = session(&service, "Beta");

        let won = service
            .start_mission(&alpha_session.id, "FALSE_FLAG", "infiltrator")
            .unwrap();
        service.complete_mission(&won.id).unwrap();
        let lost = service
            .start_mission(&beta_session.id, "FALSE_FLAG", "infiltrator")
            .unwrap();
        service
            .fail_mission(&lost.id, FailureReason::from("operator_abort"))
            .unwrap();

        let board = service.leaderboard(10, Timeframe::All);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].team_id, alpha.id);
        assert_eq!(board[0].team_name, "Alpha");
        assert_eq!(board[0].total_score, 6900);
        assert_eq!(board[0].average_rank, Rank::S);
        assert_eq!(board[1].team_id, beta.id);
        assert_eq!(board[1].total_score, 3450);
        assert_eq!(board[1].average_rank, Rank::F);
        assert_eq!(service.leaderboard(1, Timeframe::All).len(), 1);

        clock.advance_secs(8 * 24 * 3600);
        assert!(service.leaderboard(10, Timeframe::Weekly).is_empty());
        assert_eq!(service.leaderboard(10, Timeframe::Monthly).len(), 2);
        assert_eq!("weekly".parse::<Timeframe>(), Ok(Timeframe::Weekly));
    }
}
