//! Objectives as seen by the planner, and the goal-tracker contract.
//!
//! The tracker is owned elsewhere; the planner only reads the current
//! objective and reports scene visits. [`InMemoryGoalTracker`] is a simple
//! queue-backed implementation for tools, the harness, and tests.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// What an objective asks for, with its type-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalKind {
    /// Reach the room whose purpose equals `scene_id`.
    ReachScene { scene_id: String },
    /// Reach any room holding one of `item_ids`.
    CollectItems { item_ids: Vec<String> },
    /// Reach the room tied to `target_id` through a story beat or purpose,
    /// else one holding it as a quest item.
    InteractTarget { target_id: String },
    /// NPCs are assumed reachable in the entry room.
    InteractNpc { npc_id: String },
    ReachExit,
    /// Visit each scene once, in order.
    VisitScenes { scene_ids: Vec<String> },
    /// A goal type this subsystem does not know how to place.
    #[serde(other)]
    Unknown,
}

/// A goal as handed out by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalState {
    pub id: String,
    #[serde(flatten)]
    pub kind: GoalKind,
    /// Exact point to walk to in the target room instead of its center.
    #[serde(default)]
    pub destination: Option<Vec3>,
}

impl GoalState {
    pub fn new(id: impl Into<String>, kind: GoalKind) -> Self {
        Self {
            id: id.into(),
            kind,
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: Vec3) -> Self {
        self.destination = Some(destination);
        self
    }
}

/// The external objective tracker, as consumed by the planner.
pub trait GoalTracker {
    fn current_objective(&self, character_id: &str) -> Option<GoalState>;
    fn track_scene_visit(&mut self, character_id: &str, scene_id: &str);
    fn visited_scenes(&self, character_id: &str) -> HashSet<String>;
}

/// Per-character objective queues plus visit sets.
#[derive(Debug, Default)]
pub struct InMemoryGoalTracker {
    objectives: HashMap<String, VecDeque<GoalState>>,
    visits: HashMap<String, HashSet<String>>,
}

impl InMemoryGoalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an objective behind any the character already has.
    pub fn assign(&mut self, character_id: &str, goal: GoalState) {
        self.objectives
            .entry(character_id.to_string())
            .or_default()
            .push_back(goal);
    }

    /// Remove `goal_id` from the character's queue. Returns whether it was there.
    pub fn complete(&mut self, character_id: &str, goal_id: &str) -> bool {
        let Some(queue) = self.objectives.get_mut(character_id) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|g| g.id != goal_id);
        queue.len() != before
    }

    pub fn clear(&mut self, character_id: &str) {
        self.objectives.remove(character_id);
    }
}

impl GoalTracker for InMemoryGoalTracker {
    fn current_objective(&self, character_id: &str) -> Option<GoalState> {
        self.objectives
            .get(character_id)
            .and_then(|q| q.front())
            .cloned()
    }

    fn track_scene_visit(&mut self, character_id: &str, scene_id: &str) {
        self.visits
            .entry(character_id.to_string())
            .or_default()
            .insert(scene_id.to_string());
    }

    fn visited_scenes(&self, character_id: &str) -> HashSet<String> {
        self.visits.get(character_id).cloned().unwrap_or_default()
    }
}
