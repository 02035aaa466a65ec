//! Goal-driven multi-room navigation for stage characters.
//!
//! This crate holds everything between "the character wants X" and "the
//! character is at (x, y, z) facing θ this frame". It owns no renderer,
//! physics engine or persistence; callers push a frame delta in and read
//! positions back out, which keeps it unit-testable and usable from a
//! game server, a tool, or the headless harness alike.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bounds`] | Axis-aligned ground rectangles, containment and clamping |
//! | [`config`] | Navigator and planner tuning with serde defaults |
//! | [`error`] | Graph, path and config error types |
//! | [`goals`] | Objective types and the goal-tracker contract |
//! | [`graph`] | Rooms, doors, stairs and the stage room graph |
//! | [`math`] | Ground-plane and world vectors |
//! | [`navigator`] | Per-character steering locomotion with safety layers |
//! | [`pathfinding`] | Lock-aware BFS over the room graph, waypoint emission |
//! | [`planner`] | Objective-driven state machine tying it all together |
//! | [`steering`] | Pure arrive/wander/flee/avoidance force functions |

pub mod bounds;
pub mod config;
pub mod error;
pub mod goals;
pub mod graph;
pub mod math;
pub mod navigator;
pub mod pathfinding;
pub mod planner;
pub mod steering;
