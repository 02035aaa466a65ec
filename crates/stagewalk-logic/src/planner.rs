//! Objective planner: one finite-state machine per AI character.
//!
//! # States
//!
//! | State | Leaves when | Goes to |
//! |-------|-------------|---------|
//! | `Planning` | immediately (runs `plan`) | `Navigating`, `Waiting`, `Wandering` |
//! | `Navigating` | last waypoint reached | `Arriving` |
//! | `Arriving` | `arrive_pause` elapsed (fires interaction) | `Interacting` |
//! | `Interacting` | `interact_duration` elapsed | `Planning` |
//! | `Waiting` | `replan_interval` elapsed, or a door unlocks | `Planning` |
//! | `Wandering` | an objective is seen at a `replan_interval` poll | `Planning` |
//!
//! The planner never judges whether an interaction succeeded; it waits out
//! the timer and plans again. Blocked or unresolvable objectives degrade into
//! local wandering with periodic retries and no retry limit, so a permanently
//! locked route wanders forever.
//!
//! Every frame the navigator position, the current room's floor height, and
//! the heading go out through the position-update callback. While wandering,
//! an optional [`WanderDelegate`] may take over that reporting.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::goals::{GoalKind, GoalState, GoalTracker};
use crate::graph::RoomGraph;
use crate::navigator::Navigator;
use crate::pathfinding::{RoomPath, RoomPathfinder, Waypoint, WaypointKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerState {
    Planning,
    Navigating,
    Arriving,
    Interacting,
    Waiting,
    Wandering,
}

/// Where the character is this frame, for rendering and goal tracking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians, zero facing +z.
    pub rotation: f32,
}

/// Alternate owner of position reporting while wandering (ambient wander modes).
pub trait WanderDelegate {
    fn update(&mut self, dt: f32) -> PositionUpdate;
}

/// Shared, per-stage collaborators handed to every planner call.
///
/// One pathfinder serves all characters of a stage, so an unlock performed
/// through any planner is visible to the rest.
pub struct PlannerContext<'a> {
    pub pathfinder: &'a mut RoomPathfinder,
    pub goals: &'a mut dyn GoalTracker,
}

type RoomTransitionFn = Box<dyn FnMut(&str, Option<&str>)>;
type InteractionFn = Box<dyn FnMut(&GoalState)>;
type StateChangeFn = Box<dyn FnMut(PlannerState)>;
type PositionUpdateFn = Box<dyn FnMut(PositionUpdate)>;

/// Outbound notifications. Unset callbacks are skipped.
#[derive(Default)]
pub struct PlannerCallbacks {
    room_transition: Option<RoomTransitionFn>,
    interaction: Option<InteractionFn>,
    state_change: Option<StateChangeFn>,
    position_update: Option<PositionUpdateFn>,
}

impl PlannerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(new_room, previous_room)`
    pub fn on_room_transition(mut self, f: impl FnMut(&str, Option<&str>) + 'static) -> Self {
        self.room_transition = Some(Box::new(f));
        self
    }

    pub fn on_interaction(mut self, f: impl FnMut(&GoalState) + 'static) -> Self {
        self.interaction = Some(Box::new(f));
        self
    }

    pub fn on_state_change(mut self, f: impl FnMut(PlannerState) + 'static) -> Self {
        self.state_change = Some(Box::new(f));
        self
    }

    pub fn on_position_update(mut self, f: impl FnMut(PositionUpdate) + 'static) -> Self {
        self.position_update = Some(Box::new(f));
        self
    }
}

pub struct ObjectivePlanner {
    character_id: String,
    config: PlannerConfig,
    navigator: Navigator,
    state: PlannerState,
    current_goal: Option<GoalState>,
    target_room: Option<String>,
    current_room: Option<String>,
    path: Option<RoomPath>,
    waypoint_index: usize,
    timer: f32,
    path_requests: u64,
    callbacks: PlannerCallbacks,
    wander_delegate: Option<Box<dyn WanderDelegate>>,
}

impl ObjectivePlanner {
    /// Starts in `Planning`; the first `update` runs the planner.
    pub fn new(character_id: impl Into<String>, navigator: Navigator, config: PlannerConfig) -> Self {
        Self {
            character_id: character_id.into(),
            config,
            navigator,
            state: PlannerState::Planning,
            current_goal: None,
            target_room: None,
            current_room: None,
            path: None,
            waypoint_index: 0,
            timer: 0.0,
            path_requests: 0,
            callbacks: PlannerCallbacks::default(),
            wander_delegate: None,
        }
    }

    pub fn with_callbacks(mut self, callbacks: PlannerCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn set_callbacks(&mut self, callbacks: PlannerCallbacks) {
        self.callbacks = callbacks;
    }

    pub fn set_wander_delegate(&mut self, delegate: Option<Box<dyn WanderDelegate>>) {
        self.wander_delegate = delegate;
    }

    /// Override room detection, e.g. after spawning the character.
    pub fn set_current_room(&mut self, room_id: impl Into<String>) {
        self.current_room = Some(room_id.into());
    }

    // ── Frame step ──────────────────────────────────────────────────────

    pub fn update(&mut self, dt: f32, ctx: &mut PlannerContext<'_>) {
        match self.state {
            PlannerState::Planning => self.plan(ctx),
            PlannerState::Navigating => self.navigate(ctx),
            PlannerState::Arriving => {
                self.timer += dt;
                if self.timer >= self.config.arrive_pause {
                    self.navigator.stop();
                    if let (Some(goal), Some(cb)) = (&self.current_goal, &mut self.callbacks.interaction) {
                        cb(goal);
                    }
                    self.set_state(PlannerState::Interacting);
                }
            }
            PlannerState::Interacting => {
                self.timer += dt;
                if self.timer >= self.config.interact_duration {
                    self.replan(ctx);
                }
            }
            PlannerState::Waiting => {
                self.timer += dt;
                if self.timer >= self.config.replan_interval {
                    self.replan(ctx);
                }
            }
            PlannerState::Wandering => {
                self.timer += dt;
                if self.timer >= self.config.replan_interval {
                    self.timer = 0.0;
                    if ctx.goals.current_objective(&self.character_id).is_some() {
                        self.replan(ctx);
                    }
                }
            }
        }

        if self.state == PlannerState::Wandering {
            if let Some(delegate) = &mut self.wander_delegate {
                let update = delegate.update(dt);
                if let Some(cb) = &mut self.callbacks.position_update {
                    cb(update);
                }
                return;
            }
        }

        self.navigator.update(dt);
        self.sync_position(ctx);
    }

    // ── External events ─────────────────────────────────────────────────

    /// Pre-empts whatever is in flight if `goal_id` is the goal being pursued.
    pub fn on_goal_completed(&mut self, goal_id: &str, ctx: &mut PlannerContext<'_>) -> bool {
        let pursued = self.current_goal.as_ref().is_some_and(|g| g.id == goal_id);
        if pursued {
            tracing::debug!(character = %self.character_id, goal = goal_id, "goal completed, replanning");
            self.replan(ctx);
        }
        pursued
    }

    /// Opens the lock for everyone; replans only if this character was blocked.
    pub fn on_door_unlocked(&mut self, lock_id: &str, ctx: &mut PlannerContext<'_>) {
        ctx.pathfinder.unlock_connection(lock_id);
        if self.state == PlannerState::Waiting {
            self.replan(ctx);
        }
    }

    pub fn force_replan(&mut self, ctx: &mut PlannerContext<'_>) {
        self.replan(ctx);
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn current_goal(&self) -> Option<&GoalState> {
        self.current_goal.as_ref()
    }

    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    pub fn target_room(&self) -> Option<&str> {
        self.target_room.as_deref()
    }

    pub fn current_path(&self) -> Option<&RoomPath> {
        self.path.as_ref()
    }

    pub fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    /// How many times the pathfinder has been asked for a route.
    pub fn path_requests(&self) -> u64 {
        self.path_requests
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// For obstacle resyncs and strategy changes.
    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn replan(&mut self, ctx: &mut PlannerContext<'_>) {
        self.set_state(PlannerState::Planning);
        self.plan(ctx);
    }

    fn plan(&mut self, ctx: &mut PlannerContext<'_>) {
        self.path = None;
        self.waypoint_index = 0;
        self.target_room = None;

        let pos = self.navigator.position();
        if self.current_room.is_none() {
            self.current_room = ctx
                .pathfinder
                .room_at_point(pos.x, pos.y, pos.z)
                .map(str::to_string);
        } else {
            // a pre-empted route may have crossed a doorway since the last waypoint
            self.detect_room(ctx, pos.y);
        }

        let Some(goal) = ctx.goals.current_objective(&self.character_id) else {
            self.current_goal = None;
            self.wander_locally(ctx, PlannerState::Wandering);
            return;
        };
        self.current_goal = Some(goal.clone());

        let visited = match goal.kind {
            GoalKind::VisitScenes { .. } => ctx.goals.visited_scenes(&self.character_id),
            _ => HashSet::new(),
        };
        let Some(target) = resolve_target_room(&goal, ctx.pathfinder.graph(), &visited) else {
            tracing::debug!(character = %self.character_id, goal = %goal.id, "objective has no matching room");
            self.wander_locally(ctx, PlannerState::Wandering);
            return;
        };
        self.target_room = Some(target.clone());

        let Some(current) = self.current_room.clone() else {
            tracing::debug!(character = %self.character_id, "character is outside every room");
            self.wander_locally(ctx, PlannerState::Wandering);
            return;
        };

        if current == target {
            let Some(room) = ctx.pathfinder.room(&target) else {
                self.wander_locally(ctx, PlannerState::Wandering);
                return;
            };
            let dest = goal.destination.unwrap_or_else(|| room.center());
            let start = self.navigator.position();
            let waypoint = Waypoint {
                x: dest.x,
                y: dest.y,
                z: dest.z,
                room_id: target.clone(),
                kind: WaypointKind::Destination,
            };
            let bounds = room.bounds();
            self.path = Some(RoomPath {
                rooms: vec![target],
                waypoints: vec![waypoint],
                distance_estimate: start.distance(&dest),
            });
            self.navigator.constrain_to(bounds);
            self.navigator.move_to(dest.x, dest.z);
            self.set_state(PlannerState::Navigating);
            return;
        }

        self.path_requests += 1;
        let from_pos = self.navigator.position();
        match ctx
            .pathfinder
            .find_path(&current, &target, Some(from_pos), goal.destination)
        {
            None => {
                tracing::debug!(
                    character = %self.character_id,
                    from = %current,
                    to = %target,
                    "route blocked, waiting"
                );
                self.wander_locally(ctx, PlannerState::Waiting);
            }
            Some(path) => {
                tracing::debug!(
                    character = %self.character_id,
                    rooms = ?path.rooms,
                    waypoints = path.waypoints.len(),
                    "route planned"
                );
                match ctx.pathfinder.graph().layout_bounds() {
                    Some(bounds) => self.navigator.constrain_to(bounds),
                    None => self.navigator.clear_bounds(),
                }
                if let Some(first) = path.waypoints.first() {
                    self.navigator.move_to(first.x, first.z);
                }
                self.path = Some(path);
                self.set_state(PlannerState::Navigating);
            }
        }
    }

    fn navigate(&mut self, ctx: &mut PlannerContext<'_>) {
        let Some(path) = &self.path else {
            self.replan(ctx);
            return;
        };
        let Some(waypoint) = path.waypoints.get(self.waypoint_index) else {
            self.set_state(PlannerState::Arriving);
            return;
        };

        let pos = self.navigator.ground_position();
        let reached = pos.distance(&waypoint.position().ground()) < self.config.waypoint_threshold
            || self.navigator.has_arrived();
        if !reached {
            return;
        }

        tracing::trace!(
            character = %self.character_id,
            index = self.waypoint_index,
            kind = ?waypoint.kind,
            "waypoint reached"
        );
        let height = waypoint.y;
        let next = path
            .waypoints
            .get(self.waypoint_index + 1)
            .map(|w| (w.x, w.z));
        self.waypoint_index += 1;
        self.navigator.set_height(height);
        self.detect_room(ctx, height);

        match next {
            Some((x, z)) => self.navigator.move_to(x, z),
            None => self.set_state(PlannerState::Arriving),
        }
    }

    /// Re-detect the room under the navigator, firing the transition and
    /// scene visit on a change. Outside every room the stored id is kept.
    fn detect_room(&mut self, ctx: &mut PlannerContext<'_>, height: f32) {
        let pos = self.navigator.position();
        let Some(room_id) = ctx.pathfinder.room_at_point(pos.x, height, pos.z) else {
            return;
        };
        if self.current_room.as_deref() == Some(room_id) {
            return;
        }
        let previous = self.current_room.replace(room_id.to_string());
        if let Some(cb) = &mut self.callbacks.room_transition {
            cb(room_id, previous.as_deref());
        }
        if let Some(room) = ctx.pathfinder.room(room_id) {
            if !room.purpose.is_empty() {
                ctx.goals.track_scene_visit(&self.character_id, &room.purpose);
            }
        }
    }

    /// Constrain to the current room and wander there.
    fn wander_locally(&mut self, ctx: &PlannerContext<'_>, state: PlannerState) {
        match self
            .current_room
            .as_deref()
            .and_then(|r| ctx.pathfinder.room_bounds(r))
        {
            Some(bounds) => self.navigator.constrain_to(bounds),
            None => self.navigator.clear_bounds(),
        }
        self.navigator.wander();
        self.set_state(state);
    }

    fn sync_position(&mut self, ctx: &PlannerContext<'_>) {
        let Some(cb) = &mut self.callbacks.position_update else {
            return;
        };
        let pos = self.navigator.position();
        let y = self
            .current_room
            .as_deref()
            .and_then(|r| ctx.pathfinder.room(r))
            .map_or(pos.y, |room| room.floor_height());
        cb(PositionUpdate {
            x: pos.x,
            y,
            z: pos.z,
            rotation: self.navigator.heading(),
        });
    }

    fn set_state(&mut self, state: PlannerState) {
        self.timer = 0.0;
        if self.state == state {
            return;
        }
        tracing::debug!(
            character = %self.character_id,
            from = ?self.state,
            to = ?state,
            "planner state change"
        );
        self.state = state;
        if let Some(cb) = &mut self.callbacks.state_change {
            cb(state);
        }
    }
}

/// Map an objective to the room that satisfies it.
///
/// `visited` is only consulted for [`GoalKind::VisitScenes`].
pub fn resolve_target_room(goal: &GoalState, graph: &RoomGraph, visited: &HashSet<String>) -> Option<String> {
    let found = match &goal.kind {
        GoalKind::ReachScene { scene_id } => graph.rooms_with_purpose(scene_id).next(),
        GoalKind::CollectItems { item_ids } => graph
            .rooms()
            .iter()
            .find(|r| item_ids.iter().any(|item| r.has_quest_item(item))),
        GoalKind::InteractTarget { target_id } => graph
            .rooms()
            .iter()
            .find(|r| r.has_story_beat(target_id) || r.purpose.contains(target_id.as_str()))
            .or_else(|| graph.rooms().iter().find(|r| r.has_quest_item(target_id))),
        GoalKind::InteractNpc { .. } => graph.room(graph.entry_room()),
        GoalKind::ReachExit => graph.room(graph.exit_room()),
        GoalKind::VisitScenes { scene_ids } => scene_ids
            .iter()
            .find(|scene| !visited.contains(scene.as_str()))
            .and_then(|scene| graph.rooms_with_purpose(scene).next()),
        GoalKind::Unknown => None,
    };
    found.map(|r| r.id.clone())
}
