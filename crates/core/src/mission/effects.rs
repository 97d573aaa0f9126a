//! Ability effect table.

use serde::{Deserialize, Serialize};

use crate::content::{Ability, EffectTag};

/// Length of the dodge window in seconds, independent of ability duration.
pub const DODGE_WINDOW_SECS: u64 = 8;

/// Kinds of timed effects tracked on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    LogsDisabled,
    /// Blocks every trace increase while active.
    TraceImmunity,
    PersonaOverlay,
    MovementMasked,
    VulnerabilitiesHighlighted,
    MapRevealed,
}

/// Descriptor of what an ability activation did, handed to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectOutcome {
    pub trace_reduction: f64,
    pub stealth_bonus: u32,
    pub social_bonus: u32,
    pub efficiency_bonus: u32,
    pub hacking_bonus: u32,
    pub awareness_bonus: u32,
    /// Seconds the effect lasts, zero for instant effects.
    pub duration: u64,
    pub trace_immunity: bool,
    pub hex_shard_created: bool,
    pub team_wide: bool,
    pub map_revealed: bool,
    pub message: String,
}

/// Timed effect to register on the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEffect {
    pub kind: EffectKind,
    pub duration_secs: u64,
}

/// Map an ability to its effect descriptor and optional timed effect.
pub fn resolve(ability: &Ability) -> (EffectOutcome, Option<TimedEffect>) {
    let mut outcome = EffectOutcome {
        duration: ability.duration,
        team_wide: ability.team_wide,
        message: format!("{} activated", ability.name),
        ..EffectOutcome::default()
    };
    let timed = |kind| {
        Some(TimedEffect {
            kind,
            duration_secs: ability.duration,
        })
    };

    let timed_effect = match ability.effect {
        EffectTag::DisableLogs => {
            outcome.stealth_bonus = 25;
            outcome.message = "External logs disabled - stealth operations enhanced".into();
            timed(EffectKind::LogsDisabled)
        }
        EffectTag::CreateHexShard => {
            outcome.hex_shard_created = true;
            outcome.message = "Hex-shard synthesized - emergency bypass available".into();
            None
        }
        EffectTag::RerouteChecks => {
            outcome.trace_reduction = 15.0;
            outcome.stealth_bonus = 40;
            outcome.trace_immunity = true;
            outcome.message = "System lattice active - security checks rerouted".into();
            timed(EffectKind::TraceImmunity)
        }
        EffectTag::PersonaOverlay => {
            outcome.stealth_bonus = 30;
            outcome.social_bonus = 50;
            outcome.message = "False identity active - social interactions enhanced".into();
            timed(EffectKind::PersonaOverlay)
        }
        EffectTag::RedirectInvestigation => {
            outcome.trace_reduction = f64::from(ability.trace_reduction);
            outcome.message = "Forged identity planted - investigation misdirected".into();
            None
        }
        EffectTag::MaskMovement => {
            outcome.team_wide = true;
            outcome.stealth_bonus = 35;
            outcome.message = "Team movement masked - coordinated stealth enhanced".into();
            timed(EffectKind::MovementMasked)
        }
        EffectTag::RevealTraps => {
            outcome.trace_reduction = 5.0;
            outcome.awareness_bonus = 100;
            outcome.message = "Hidden threats revealed - team awareness enhanced".into();
            None
        }
        EffectTag::HighlightVulnerabilities => {
            outcome.efficiency_bonus = 20;
            outcome.hacking_bonus = 30;
            outcome.message =
                "System vulnerabilities highlighted - hacking efficiency increased".into();
            timed(EffectKind::VulnerabilitiesHighlighted)
        }
        EffectTag::DodgeWindow => {
            outcome.trace_immunity = true;
            outcome.duration = DODGE_WINDOW_SECS;
            outcome.message = "Predictive analysis active - next security sweep predicted".into();
            Some(TimedEffect {
                kind: EffectKind::TraceImmunity,
                duration_secs: DODGE_WINDOW_SECS,
            })
        }
        EffectTag::RevealMap => {
            outcome.map_revealed = true;
            outcome.efficiency_bonus = 40;
            outcome.message = "Oracle burst active - optimal mission paths revealed".into();
            timed(EffectKind::MapRevealed)
        }
    };

    (outcome, timed_effect.filter(|effect| effect.duration_secs > 0))
}
