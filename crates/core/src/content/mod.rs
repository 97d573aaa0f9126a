//! Static mission and agent content.
//!
//! Content is parsed once into an immutable [`ContentRegistry`] and shared
//! read-only by every engine. The built-in tables ship embedded in the crate.

mod models;

use std::{collections::BTreeMap, sync::Arc};

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use tracing::debug;

pub use models::{
    Ability, AbilityKind, AbilitySlot, Agent, AgentAbilities, AgentStats, Complexity, Difficulty,
    EffectTag, MissionType, ObjectiveTemplate, PassiveAbility, PassiveEffect, Phase,
};

/// Built-in mission type table.
pub const BUILTIN_MISSIONS: &str = include_str!("../data/missions.json");
/// Built-in agent table.
pub const BUILTIN_AGENTS: &str = include_str!("../data/agents.json");

static BUILTIN: Lazy<Arc<ContentRegistry>> = Lazy::new(|| {
    let registry = ContentRegistry::from_json(BUILTIN_MISSIONS, BUILTIN_AGENTS)
        .unwrap_or_else(|err| panic!("built-in content is invalid: {err:#}"));
    Arc::new(registry)
});

/// Read-only lookup of mission types and agents keyed by id.
#[derive(Debug, Clone)]
pub struct ContentRegistry {
    missions: BTreeMap<String, MissionType>,
    agents: BTreeMap<String, Agent>,
}

impl ContentRegistry {
    /// Shared registry holding the built-in content.
    pub fn builtin() -> Arc<ContentRegistry> {
        BUILTIN.clone()
    }

    /// Parse and validate content from JSON arrays of missions and agents.
    pub fn from_json(missions: &str, agents: &str) -> Result<Self> {
        let missions: Vec<MissionType> =
            serde_json::from_str(missions).context("failed to parse mission content")?;
        let agents: Vec<Agent> =
            serde_json::from_str(agents).context("failed to parse agent content")?;
        Self::from_parts(missions, agents)
    }

    /// Build from already-parsed definitions, validating them.
    pub fn from_parts(missions: Vec<MissionType>, agents: Vec<Agent>) -> Result<Self> {
        let mut registry = Self {
            missions: BTreeMap::new(),
            agents: BTreeMap::new(),
        };
        for mission in missions {
            validate_mission(&mission)?;
            if registry.missions.contains_key(&mission.id) {
                bail!("duplicate mission type {}", mission.id);
            }
            registry.missions.insert(mission.id.clone(), mission);
        }
        for agent in agents {
            validate_agent(&agent)?;
            if registry.agents.contains_key(&agent.id) {
                bail!("duplicate agent {}", agent.id);
            }
            registry.agents.insert(agent.id.clone(), agent);
        }
        debug!(
            missions = registry.missions.len(),
            agents = registry.agents.len(),
            "Content registry loaded"
        );
        Ok(registry)
    }

    /// Mission type by id.
    pub fn mission(&self, id: &str) -> Option<&MissionType> {
        self.missions.get(id)
    }

    /// Agent by id.
    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Mission types ordered by id.
    pub fn missions(&self) -> impl Iterator<Item = &MissionType> {
        self.missions.values()
    }

    /// Agents ordered by id.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }
}

fn validate_mission(mission: &MissionType) -> Result<()> {
    if mission.phases.is_empty() {
        bail!("mission {} has no phases", mission.id);
    }
    if mission.duration == 0 {
        bail!("mission {} has zero duration", mission.id);
    }
    let mut seen = Vec::new();
    for (index, phase) in mission.phases.iter().enumerate() {
        let expected = index as u32 + 1;
        if phase.id != expected {
            bail!(
                "mission {} phase {} out of order (expected {})",
                mission.id,
                phase.id,
                expected
            );
        }
        // A phase without objectives could never be completed.
        if phase.objectives.is_empty() {
            bail!("mission {} phase {} has no objectives", mission.id, phase.id);
        }
        for objective in &phase.objectives {
            if seen.contains(&objective.id) {
                bail!(
                    "mission {} repeats objective id {}",
                    mission.id,
                    objective.id
                );
            }
            seen.push(objective.id);
        }
    }
    Ok(())
}

fn validate_agent(agent: &Agent) -> Result<()> {
    for slot in AbilitySlot::INVOCABLE {
        let Some(ability) = agent.ability(slot) else {
            continue;
        };
        if ability.kind == AbilityKind::Charge && ability.charge_required == 0 {
            bail!(
                "agent {} {} is charge-gated without charge_required",
                agent.id,
                slot
            );
        }
    }
    Ok(())
}
