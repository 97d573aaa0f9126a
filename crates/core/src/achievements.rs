#![allow(missing_docs)]
//! Achievement predicates over completed-mission summaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    mission::MissionStatus,
    scoring::{Rank, ShardTier, ShardWallet},
};

/// Missions finished faster than this (seconds) earn Speed Demon.
pub const SPEED_DEMON_LIMIT_SECS: u64 = 1200;
/// Team shard total unlocking Data Hoarder.
pub const DATA_HOARDER_SHARDS: u64 = 100;

/// Typed view of a finished mission used by achievement predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionSummary {
    pub status: MissionStatus,
    pub trace_level: f64,
    pub time_used: u64,
    pub rank: Rank,
    pub alarms_triggered: u32,
    pub backup_tactics_used: bool,
    /// Team-wide shard total after this mission's rewards, when known.
    pub team_hex_shards: Option<u64>,
}

/// Reward granted once per team when an achievement unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementReward {
    pub hex_shards: ShardWallet,
    pub xp: u64,
}

/// The fixed achievement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    GhostOperator,
    SpeedDemon,
    PerfectCoordination,
    AdaptiveGenius,
    DataHoarder,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 5] = [
        AchievementKind::GhostOperator,
        AchievementKind::SpeedDemon,
        AchievementKind::PerfectCoordination,
        AchievementKind::AdaptiveGenius,
        AchievementKind::DataHoarder,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AchievementKind::GhostOperator => "ghost_operator",
            AchievementKind::SpeedDemon => "speed_demon",
            AchievementKind::PerfectCoordination => "perfect_coordination",
            AchievementKind::AdaptiveGenius => "adaptive_genius",
            AchievementKind::DataHoarder => "data_hoarder",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AchievementKind::GhostOperator => "Ghost Operator",
            AchievementKind::SpeedDemon => "Speed Demon",
            AchievementKind::PerfectCoordination => "Perfect Coordination",
            AchievementKind::AdaptiveGenius => "Adaptive Genius",
            AchievementKind::DataHoarder => "Data Hoarder",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AchievementKind::GhostOperator => "Complete mission with 0% trace",
            AchievementKind::SpeedDemon => "Complete all phases in under 20 minutes",
            AchievementKind::PerfectCoordination => "Achieve S-rank with no alarms triggered",
            AchievementKind::AdaptiveGenius => "Complete mission using only backup tactics",
            AchievementKind::DataHoarder => "Collect 100 hex-shards total",
        }
    }

    pub fn reward(&self) -> AchievementReward {
        let (tier, amount, xp) = match self {
            AchievementKind::GhostOperator => (ShardTier::Legendary, 2, 1000),
            AchievementKind::SpeedDemon => (ShardTier::Rare, 3, 750),
            AchievementKind::PerfectCoordination => (ShardTier::Mythic, 1, 2000),
            AchievementKind::AdaptiveGenius => (ShardTier::Legendary, 1, 1500),
            AchievementKind::DataHoarder => (ShardTier::Mythic, 1, 500),
        };
        AchievementReward {
            hex_shards: ShardWallet::of(tier, amount),
            xp,
        }
    }

    /// Whether the summary satisfies this achievement.
    pub fn is_met(&self, summary: &MissionSummary) -> bool {
        match self {
            AchievementKind::GhostOperator => summary.trace_level == 0.0,
            AchievementKind::SpeedDemon => summary.time_used < SPEED_DEMON_LIMIT_SECS,
            AchievementKind::PerfectCoordination => {
                summary.rank == Rank::S && summary.alarms_triggered == 0
            }
            AchievementKind::AdaptiveGenius => {
                summary.backup_tactics_used && summary.status == MissionStatus::Completed
            }
            AchievementKind::DataHoarder => summary
                .team_hex_shards
                .is_some_and(|total| total >= DATA_HOARDER_SHARDS),
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every achievement the summary satisfies, in declaration order.
pub fn evaluate(summary: &MissionSummary) -> Vec<AchievementKind> {
    AchievementKind::ALL
        .into_iter()
        .filter(|kind| kind.is_met(summary))
        .collect()
}
