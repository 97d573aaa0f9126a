#![allow(missing_docs)]

//! Final score, rank and hex-shard reward computation.
//!
//! Everything here is a pure function of its inputs; the engine snapshots
//! the instance into a [`ScoreInput`] and never scores live state directly.

mod cache;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cache::ScoreCache;

/// Base points before multipliers.
pub const BASE_SCORE: f64 = 1000.0;

/// Snapshot of the instance state the score depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub trace_level: f64,
    /// Seconds elapsed since mission start.
    pub time_used: u64,
    /// Mission time limit in seconds.
    pub duration: u64,
    pub completed_objectives: usize,
    pub total_objectives: usize,
    pub alarms_triggered: u32,
}

/// Individual penalty terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyComponents {
    pub alarm_penalty: f64,
    pub failed_objective_penalty: f64,
    pub trace_penalty: f64,
}

/// Score with every factor that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: u64,
    pub rank: Rank,
    pub base_score: f64,
    pub stealth_multiplier: f64,
    pub time_multiplier: f64,
    pub objective_multiplier: f64,
    pub no_alarms_bonus: f64,
    pub perfect_run_bonus: f64,
    pub speed_bonus: f64,
    pub penalties: f64,
    pub components: PenaltyComponents,
}

/// Compute the final score and rank.
pub fn calculate_score(input: &ScoreInput) -> ScoreBreakdown {
    let trace = input.trace_level.clamp(0.0, 100.0);
    let stealth_multiplier = 0.98_f64.powf(trace).max(0.3);

    let time_ratio = input.time_used as f64 / input.duration.max(1) as f64;
    let time_multiplier = (2.0 - time_ratio.powf(0.7)).max(1.0);

    let total = input.total_objectives.max(1);
    let completed = input.completed_objectives.min(total);
    let objective_ratio = completed as f64 / total as f64;
    let objective_multiplier = 1.0 + objective_ratio * 1.5;

    let no_alarms_bonus = if input.alarms_triggered == 0 { 1.5 } else { 1.0 };
    let perfect_run_bonus = if trace == 0.0 { 2.0 } else { 1.0 };
    let speed_bonus = if time_ratio < 0.5 { 1.3 } else { 1.0 };

    let components = PenaltyComponents {
        alarm_penalty: f64::from(input.alarms_triggered) * 200.0,
        failed_objective_penalty: (input.total_objectives.saturating_sub(completed)) as f64
            * 100.0,
        trace_penalty: trace.powf(1.5) * 10.0,
    };
    let penalties =
        components.alarm_penalty + components.failed_objective_penalty + components.trace_penalty;

    let raw = BASE_SCORE
        * stealth_multiplier
        * time_multiplier
        * objective_multiplier
        * no_alarms_bonus
        * perfect_run_bonus
        * speed_bonus
        - penalties;
    let score = raw.floor().max(0.0) as u64;

    ScoreBreakdown {
        score,
        rank: Rank::from_score(score),
        base_score: BASE_SCORE,
        stealth_multiplier,
        time_multiplier,
        objective_multiplier,
        no_alarms_bonus,
        perfect_run_bonus,
        speed_bonus,
        penalties,
        components,
    }
}

/// Letter grade derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Rank {
    /// Rank for a score using fixed lower bounds.
    pub fn from_score(score: u64) -> Self {
        match score {
            s if s >= 5000 => Rank::S,
            s if s >= 4000 => Rank::A,
            s if s >= 3000 => Rank::B,
            s if s >= 2000 => Rank::C,
            s if s >= 1000 => Rank::D,
            _ => Rank::F,
        }
    }

    /// Numeric weight, 6 for S down to 1 for F.
    pub fn value(&self) -> u8 {
        match self {
            Rank::S => 6,
            Rank::A => 5,
            Rank::B => 4,
            Rank::C => 3,
            Rank::D => 2,
            Rank::F => 1,
        }
    }

    /// Rank closest to the mean of the given ranks.
    pub fn average(ranks: &[Rank]) -> Rank {
        if ranks.is_empty() {
            return Rank::F;
        }
        let sum: u32 = ranks.iter().map(|rank| u32::from(rank.value())).sum();
        let average = f64::from(sum) / ranks.len() as f64;
        match average {
            a if a >= 5.5 => Rank::S,
            a if a >= 4.5 => Rank::A,
            a if a >= 3.5 => Rank::B,
            a if a >= 2.5 => Rank::C,
            a if a >= 1.5 => Rank::D,
            _ => Rank::F,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::S => "S-RANK",
            Rank::A => "A-RANK",
            Rank::B => "B-RANK",
            Rank::C => "C-RANK",
            Rank::D => "D-RANK",
            Rank::F => "F-RANK",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hex-shard rarity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardTier {
    Common,
    Uncommon,
    Rare,
    Legendary,
    Mythic,
}

/// Shard counts per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardWallet {
    pub common: u32,
    pub uncommon: u32,
    pub rare: u32,
    pub legendary: u32,
    pub mythic: u32,
}

impl ShardWallet {
    /// Wallet holding `amount` shards of a single tier.
    pub fn of(tier: ShardTier, amount: u32) -> Self {
        let mut wallet = Self::default();
        wallet.grant(tier, amount);
        wallet
    }

    pub fn grant(&mut self, tier: ShardTier, amount: u32) {
        let slot = match tier {
            ShardTier::Common => &mut self.common,
            ShardTier::Uncommon => &mut self.uncommon,
            ShardTier::Rare => &mut self.rare,
            ShardTier::Legendary => &mut self.legendary,
            ShardTier::Mythic => &mut self.mythic,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn add(&mut self, other: &ShardWallet) {
        self.grant(ShardTier::Common, other.common);
        self.grant(ShardTier::Uncommon, other.uncommon);
        self.grant(ShardTier::Rare, other.rare);
        self.grant(ShardTier::Legendary, other.legendary);
        self.grant(ShardTier::Mythic, other.mythic);
    }

    /// Shards over all tiers.
    pub fn total(&self) -> u64 {
        [
            self.common,
            self.uncommon,
            self.rare,
            self.legendary,
            self.mythic,
        ]
        .iter()
        .map(|count| u64::from(*count))
        .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Flat reward table keyed by rank.
pub fn hex_shard_reward(rank: Rank) -> ShardWallet {
    match rank {
        Rank::S => ShardWallet {
            legendary: 10,
            mythic: 5,
            ..ShardWallet::default()
        },
        Rank::A => ShardWallet {
            legendary: 7,
            rare: 15,
            ..ShardWallet::default()
        },
        Rank::B => ShardWallet {
            rare: 5,
            uncommon: 20,
            ..ShardWallet::default()
        },
        Rank::C => ShardWallet {
            rare: 3,
            uncommon: 10,
            ..ShardWallet::default()
        },
        Rank::D => ShardWallet::of(ShardTier::Common, 10),
        Rank::F => ShardWallet::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(trace_level: f64, time_used: u64, alarms: u32) -> ScoreInput {
        ScoreInput {
            trace_level,
            time_used,
            duration: 1800,
            completed_objectives: 8,
            total_objectives: 9,
            alarms_triggered: alarms,
        }
    }

    #[test]
    fn half_duration_run_scores_without_speed_bonus() {
        // 1000 * 1.0 * (2 - 0.5^0.7) * (1 + 8/9 * 1.5) * 1.5 * 2.0 - 100
        let breakdown = calculate_score(&input(0.0, 900, 0));
        assert_eq!(breakdown.stealth_multiplier, 1.0);
        assert_eq!(breakdown.perfect_run_bonus, 2.0);
        assert_eq!(breakdown.no_alarms_bonus, 1.5);
        assert_eq!(breakdown.speed_bonus, 1.0);
        assert_eq!(breakdown.penalties, 100.0);
        assert_eq!(breakdown.score, 9590);
        assert_eq!(breakdown.rank, Rank::S);
    }

    #[test]
    fn sub_half_duration_run_gets_speed_bonus() {
        let breakdown = calculate_score(&input(0.0, 899, 0));
        assert_eq!(breakdown.speed_bonus, 1.3);
        assert_eq!(breakdown.score, 12502);
    }

    #[test]
    fn full_duration_partial_run() {
        let breakdown = calculate_score(&ScoreInput {
            trace_level: 0.0,
            time_used: 1800,
            duration: 1800,
            completed_objectives: 3,
            total_objectives: 9,
            alarms_triggered: 0,
        });
        assert_eq!(breakdown.time_multiplier, 1.0);
        assert_eq!(breakdown.score, 3900);
        assert_eq!(breakdown.rank, Rank::B);
    }

    #[test]
    fn score_is_reproducible() {
        let sample = input(37.5, 1234, 2);
        assert_eq!(calculate_score(&sample), calculate_score(&sample));
    }

    #[test]
    fn score_never_increases_with_trace_or_alarms() {
        for alarms in 0..6 {
            let mut previous = u64::MAX;
            for trace in 0..=100 {
                let score = calculate_score(&input(f64::from(trace), 600, alarms)).score;
                assert!(score <= previous, "trace {trace} alarms {alarms}");
                previous = score;
            }
        }
        for trace in [0.0, 12.5, 60.0, 100.0] {
            let mut previous = u64::MAX;
            for alarms in 0..20 {
                let score = calculate_score(&input(trace, 600, alarms)).score;
                assert!(score <= previous, "trace {trace} alarms {alarms}");
                previous = score;
            }
        }
    }

    #[test]
    fn heavy_penalties_floor_at_zero() {
        let breakdown = calculate_score(&ScoreInput {
            trace_level: 100.0,
            time_used: 5000,
            duration: 1800,
            completed_objectives: 0,
            total_objectives: 9,
            alarms_triggered: 10,
        });
        assert_eq!(breakdown.score, 0);
        assert_eq!(breakdown.rank, Rank::F);
    }

    #[test]
    fn rank_thresholds() {
        assert_eq!(Rank::from_score(5000), Rank::S);
        assert_eq!(Rank::from_score(4999), Rank::A);
        assert_eq!(Rank::from_score(3000), Rank::B);
        assert_eq!(Rank::from_score(2000), Rank::C);
        assert_eq!(Rank::from_score(1000), Rank::D);
        assert_eq!(Rank::from_score(999), Rank::F);
        assert_eq!(Rank::S.to_string(), "S-RANK");
    }

    #[test]
    fn average_rank_rounds_to_nearest_tier() {
        assert_eq!(Rank::average(&[]), Rank::F);
        assert_eq!(Rank::average(&[Rank::S, Rank::A]), Rank::S);
        assert_eq!(Rank::average(&[Rank::B, Rank::D]), Rank::C);
        assert_eq!(Rank::average(&[Rank::F, Rank::F, Rank::D]), Rank::F);
    }

    #[test]
    fn shard_table_is_flat_per_rank() {
        let s = hex_shard_reward(Rank::S);
        assert_eq!((s.legendary, s.mythic, s.total()), (10, 5, 15));
        assert_eq!(hex_shard_reward(Rank::D).common, 10);
        assert!(hex_shard_reward(Rank::F).is_empty());

        let mut wallet = hex_shard_reward(Rank::C);
        wallet.add(&ShardWallet::of(ShardTier::Rare, 2));
        assert_eq!(wallet.rare, 5);
        assert_eq!(wallet.total(), 15);
    }
}
