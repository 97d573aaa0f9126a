#![allow(missing_docs)]

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Low,
    Medium,
    High,
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[default]
    Low,
    Medium,
    High,
    Extreme,
}

/// Static objective definition inside a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTemplate {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub reward: u32,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_reduction: Option<u32>,
    #[serde(default)]
    pub complexity: Complexity,
    /// Expected completion time in seconds.
    #[serde(default)]
    pub estimated_time: u32,
}

/// Ordered stage of a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// 1-based position of the phase.
    pub id: u32,
    pub name: String,
    pub min_duration: u64,
    pub max_duration: u64,
    pub objectives: Vec<ObjectiveTemplate>,
}

/// Immutable mission definition loaded from content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionType {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    /// Time limit in seconds.
    pub duration: u64,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    pub phases: Vec<Phase>,
    /// Trace level at which an alarm trips.
    pub trace_threshold: f64,
    pub success_criteria: String,
    pub failure_condition: String,
}

impl MissionType {
    /// Id of the final phase.
    pub fn last_phase(&self) -> u32 {
        self.phases.iter().map(|phase| phase.id).max().unwrap_or(1)
    }

    /// Total number of objectives over all phases.
    pub fn objective_count(&self) -> usize {
        self.phases.iter().map(|phase| phase.objectives.len()).sum()
    }

    pub fn phase(&self, id: u32) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub hacking: u32,
    pub stealth: u32,
    pub combat: u32,
    pub analysis: u32,
}

/// Always-on agent trait applied by the engine, never invoked directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PassiveEffect {
    /// Chance to halve an incoming trace increase.
    FalseTelemetryChance { probability: f64 },
    /// Multiplier on persuasion checks; no trace interaction.
    PersuasionBoost { multiplier: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassiveAbility {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub effect: PassiveEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Gated by a cooldown in seconds.
    #[default]
    Cooldown,
    /// Gated by accumulated ultimate charge.
    Charge,
}

/// Tag selecting an entry of the ability effect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTag {
    DisableLogs,
    CreateHexShard,
    RerouteChecks,
    PersonaOverlay,
    RedirectInvestigation,
    MaskMovement,
    RevealTraps,
    HighlightVulnerabilities,
    DodgeWindow,
    RevealMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: AbilityKind,
    /// Cooldown in seconds; zero means none.
    #[serde(default)]
    pub cooldown: u64,
    /// Duration of any timed effect in seconds.
    #[serde(default)]
    pub duration: u64,
    pub effect: EffectTag,
    #[serde(default)]
    pub trace_reduction: u32,
    #[serde(default)]
    pub charge_required: u32,
    #[serde(default)]
    pub team_wide: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAbilities {
    pub passive: PassiveAbility,
    pub ability1: Ability,
    pub ability2: Ability,
    pub ultimate: Ability,
}

/// Selectable operative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    pub stats: AgentStats,
    pub abilities: AgentAbilities,
}

impl Agent {
    /// Resolve an invocable ability. The passive slot has none.
    pub fn ability(&self, slot: AbilitySlot) -> Option<&Ability> {
        match slot {
            AbilitySlot::Passive => None,
            AbilitySlot::Ability1 => Some(&self.abilities.ability1),
            AbilitySlot::Ability2 => Some(&self.abilities.ability2),
            AbilitySlot::Ultimate => Some(&self.abilities.ultimate),
        }
    }

    pub fn passive(&self) -> &PassiveAbility {
        &self.abilities.passive
    }
}

/// Ability key on an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilitySlot {
    Passive,
    Ability1,
    Ability2,
    Ultimate,
}

impl AbilitySlot {
    pub const INVOCABLE: [AbilitySlot; 3] = [
        AbilitySlot::Ability1,
        AbilitySlot::Ability2,
        AbilitySlot::Ultimate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AbilitySlot::Passive => "passive",
            AbilitySlot::Ability1 => "ability1",
            AbilitySlot::Ability2 => "ability2",
            AbilitySlot::Ultimate => "ultimate",
        }
    }
}

impl fmt::Display for AbilitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbilitySlot {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "passive" => Ok(AbilitySlot::Passive),
            "ability1" => Ok(AbilitySlot::Ability1),
            "ability2" => Ok(AbilitySlot::Ability2),
            "ultimate" => Ok(AbilitySlot::Ultimate),
            other => Err(EngineError::InvalidAbility(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passive_effect_is_tagged_by_effect_field() {
        let passive: PassiveAbility = serde_json::from_value(json!({
            "name": "Cipher Cache",
            "effect": "false_telemetry_chance",
            "probability": 0.15
        }))
        .unwrap();
        assert_eq!(
            passive.effect,
            PassiveEffect::FalseTelemetryChance { probability: 0.15 }
        );
    }

    #[test]
    fn slot_parsing_rejects_unknown_keys() {
        assert_eq!("ultimate".parse::<AbilitySlot>().unwrap(), AbilitySlot::Ultimate);
        let err = "ability3".parse::<AbilitySlot>().unwrap_err();
        assert_eq!(err, EngineError::InvalidAbility("ability3".into()));
    }
}
