//! Steering behaviors as pure force functions on the ground plane.
//!
//! Each behavior returns a force vector. The navigator sums them in a fixed
//! order (primary behavior, then obstacle avoidance), clamps the sum to
//! `max_force` and integrates. Keeping the order fixed makes a seeded run
//! reproduce the same floats on every platform.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// A solid collider the navigator steers around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec2,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(x: f32, z: f32, radius: f32) -> Self {
        Self {
            center: Vec2::new(x, z),
            radius,
        }
    }
}

/// Seek `target`, slowing linearly inside `slowing_radius`.
pub fn arrive(position: Vec2, velocity: Vec2, target: Vec2, max_speed: f32, slowing_radius: f32) -> Vec2 {
    let offset = target - position;
    let dist = offset.length();
    if dist <= f32::EPSILON {
        return -velocity;
    }
    let speed = if dist < slowing_radius {
        max_speed * dist / slowing_radius
    } else {
        max_speed
    };
    offset * (speed / dist) - velocity
}

/// Full-speed flight directly away from `threat`.
pub fn flee(position: Vec2, velocity: Vec2, threat: Vec2, max_speed: f32) -> Vec2 {
    let mut away = (position - threat).normalize();
    if away.is_zero() {
        // standing on the threat: any direction will do, keep it deterministic
        away = Vec2::new(0.0, 1.0);
    }
    away * max_speed - velocity
}

/// Wander-circle state carried between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WanderState {
    /// Offset of the wander target around the circle, relative to heading.
    pub angle: f32,
}

/// Circle placement for [`wander`].
#[derive(Debug, Clone, Copy)]
pub struct WanderParams {
    pub radius: f32,
    pub distance: f32,
    pub jitter: f32,
}

/// Reynolds wander: a point on a circle projected ahead of the agent, nudged
/// a little each call.
///
/// The result is never shorter than `distance - radius`, so as long as the
/// circle sits ahead of the agent the force never vanishes.
pub fn wander<R: Rng>(heading: f32, state: &mut WanderState, params: &WanderParams, rng: &mut R) -> Vec2 {
    state.angle += rng.gen_range(-1.0f32..=1.0) * params.jitter;
    let ahead = Vec2::from_yaw(heading) * params.distance;
    let rim = Vec2::from_yaw(heading + state.angle) * params.radius;
    ahead + rim
}

/// Repulsion from every obstacle whose clearance zone contains the agent,
/// strongest at contact and fading to zero at `range` beyond the surfaces.
pub fn avoid_obstacles(
    position: Vec2,
    velocity: Vec2,
    obstacles: &[Obstacle],
    agent_radius: f32,
    range: f32,
    weight: f32,
) -> Vec2 {
    let mut force = Vec2::ZERO;
    for obstacle in obstacles {
        let offset = position - obstacle.center;
        let dist = offset.length();
        let reach = obstacle.radius + agent_radius + range;
        if dist >= reach {
            continue;
        }
        let away = if dist > f32::EPSILON {
            offset * (1.0 / dist)
        } else {
            // dead center: sidestep perpendicular to travel
            let side = Vec2::new(velocity.z, -velocity.x).normalize();
            if side.is_zero() {
                Vec2::new(1.0, 0.0)
            } else {
                side
            }
        };
        force += away * (weight * (1.0 - dist / reach));
    }
    force
}
