//! Per-character steering locomotion.
//!
//! The navigator accumulates behavior forces, clamps, integrates velocity and
//! position once per `update`, then runs two safety layers on the integrated
//! position:
//!
//! 1. **Bounds clamp**: position is clamped into the configured rectangle and
//!    the velocity component driving into the wall is dropped, so an agent
//!    pressed against a wall stalls instead of oscillating.
//! 2. **Walkability gate**: if a predicate is installed and rejects the new
//!    position, the step is rolled back and velocity zeroed. This is a
//!    discrete check: fast agents at low frame rates can visibly snap back.
//!
//! Obstacles are not discovered; the caller pushes them with
//! [`Navigator::set_obstacles`] whenever the surrounding room changes.
//!
//! Commands (`move_to`, `wander`, ...) issued before `update` in a frame take
//! effect that frame.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::bounds::RoomBounds;
use crate::config::NavigatorConfig;
use crate::math::{Vec2, Vec3};
use crate::steering::{self, Obstacle, WanderParams, WanderState};

/// Predicate deciding whether a ground position may be stood on.
pub type WalkabilityFn = Box<dyn Fn(f32, f32) -> bool>;

/// Floor elevation at a ground position.
pub type GroundHeightFn = Box<dyn Fn(f32, f32) -> f32>;

/// What the navigator is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigatorMode {
    Idle,
    MoveTo,
    Wander,
    Follow,
    Flee,
}

pub struct Navigator {
    config: NavigatorConfig,
    mode: NavigatorMode,
    position: Vec2,
    height: f32,
    velocity: Vec2,
    heading: f32,
    target: Option<Vec2>,
    arrived: bool,
    steering: Vec2,
    wander_state: WanderState,
    rng: StdRng,
    obstacles: Vec<Obstacle>,
    bounds: Option<RoomBounds>,
    walkable: Option<WalkabilityFn>,
    ground_height: Option<GroundHeightFn>,
}

impl Navigator {
    pub fn new(config: NavigatorConfig, position: Vec3) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            mode: NavigatorMode::Idle,
            position: position.ground(),
            height: position.y,
            velocity: Vec2::ZERO,
            heading: 0.0,
            target: None,
            arrived: false,
            steering: Vec2::ZERO,
            wander_state: WanderState::default(),
            rng,
            obstacles: Vec::new(),
            bounds: None,
            walkable: None,
            ground_height: None,
        }
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Arrive at `(x, z)`; reverts to idle with `has_arrived()` once within
    /// the arrival threshold.
    pub fn move_to(&mut self, x: f32, z: f32) {
        self.enter(NavigatorMode::MoveTo);
        self.target = Some(Vec2::new(x, z));
    }

    /// Undirected exploration. Never arrives.
    pub fn wander(&mut self) {
        if self.mode != NavigatorMode::Wander {
            self.enter(NavigatorMode::Wander);
        }
    }

    /// Continuous pursuit: re-targets without resetting when already following.
    pub fn follow(&mut self, x: f32, z: f32) {
        if self.mode != NavigatorMode::Follow {
            self.enter(NavigatorMode::Follow);
        }
        self.target = Some(Vec2::new(x, z));
    }

    /// Run directly away from `(x, z)`.
    pub fn flee(&mut self, x: f32, z: f32) {
        self.enter(NavigatorMode::Flee);
        self.target = Some(Vec2::new(x, z));
    }

    /// Park: idle with zero velocity.
    pub fn stop(&mut self) {
        self.enter(NavigatorMode::Idle);
        self.velocity = Vec2::ZERO;
    }

    /// Place the agent without integrating. Optionally sets the heading, which
    /// otherwise keeps following velocity.
    pub fn teleport(&mut self, x: f32, z: f32, heading: Option<f32>) {
        self.position = Vec2::new(x, z);
        self.velocity = Vec2::ZERO;
        if let Some(h) = heading {
            self.heading = h;
        }
        if let Some(ground) = &self.ground_height {
            self.height = ground(x, z);
        }
    }

    // ── Environment ─────────────────────────────────────────────────────

    /// Replace the obstacle set (room contents changed).
    pub fn set_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        self.obstacles = obstacles;
    }

    pub fn constrain_to(&mut self, bounds: RoomBounds) {
        self.bounds = Some(bounds);
    }

    pub fn clear_bounds(&mut self) {
        self.bounds = None;
    }

    pub fn set_walkability(&mut self, predicate: Option<WalkabilityFn>) {
        self.walkable = predicate;
    }

    pub fn set_ground_height(&mut self, ground: Option<GroundHeightFn>) {
        self.ground_height = ground;
    }

    /// Tracked elevation, used when no ground-height function is installed.
    pub fn set_height(&mut self, y: f32) {
        self.height = y;
    }

    // ── Frame step ──────────────────────────────────────────────────────

    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        if self.mode == NavigatorMode::Idle {
            self.velocity = Vec2::ZERO;
            self.steering = Vec2::ZERO;
            return;
        }

        let force = self.accumulate_forces();
        self.steering = force.clamp_length(self.config.max_force);
        let accel = self.steering * (1.0 / self.config.mass);
        self.velocity = (self.velocity + accel * dt).clamp_length(self.config.max_speed);

        let previous = self.position;
        self.position += self.velocity * dt;

        if let Some(bounds) = self.bounds {
            let (x, z) = bounds.clamp(self.position.x, self.position.z, self.config.agent_radius);
            if x != self.position.x {
                self.velocity.x = 0.0;
            }
            if z != self.position.z {
                self.velocity.z = 0.0;
            }
            self.position = Vec2::new(x, z);
        }

        if let Some(walkable) = &self.walkable {
            if !walkable(self.position.x, self.position.z) {
                self.position = previous;
                self.velocity = Vec2::ZERO;
            }
        }

        if let Some(ground) = &self.ground_height {
            self.height = ground(self.position.x, self.position.z);
        }

        if self.velocity.length_squared() > 1e-6 {
            self.heading = self.velocity.yaw();
        }

        if self.mode == NavigatorMode::MoveTo {
            if let Some(target) = self.target {
                if self.position.distance(&target) < self.config.arrival_threshold {
                    self.enter(NavigatorMode::Idle);
                    self.velocity = Vec2::ZERO;
                    self.arrived = true;
                }
            }
        }
    }

    // ── State ───────────────────────────────────────────────────────────

    pub fn mode(&self) -> NavigatorMode {
        self.mode
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.position.x, self.height, self.position.z)
    }

    pub fn ground_position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Yaw in radians, zero facing +z.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    /// Clamped force applied on the last update.
    pub fn steering_force(&self) -> Vec2 {
        self.steering
    }

    pub fn bounds(&self) -> Option<RoomBounds> {
        self.bounds
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Steering state is rebuilt from scratch on every mode change.
    fn enter(&mut self, mode: NavigatorMode) {
        self.mode = mode;
        self.target = None;
        self.arrived = false;
        self.steering = Vec2::ZERO;
        self.wander_state = WanderState::default();
    }

    fn accumulate_forces(&mut self) -> Vec2 {
        let cfg = &self.config;
        match self.mode {
            NavigatorMode::Idle => Vec2::ZERO,
            NavigatorMode::MoveTo => {
                let Some(target) = self.target else {
                    return Vec2::ZERO;
                };
                let seek = steering::arrive(
                    self.position,
                    self.velocity,
                    target,
                    cfg.max_speed,
                    cfg.slowing_radius,
                );
                seek + self.avoidance()
            }
            NavigatorMode::Follow => match self.target {
                Some(target) => {
                    steering::arrive(
                        self.position,
                        self.velocity,
                        target,
                        cfg.max_speed,
                        cfg.slowing_radius,
                    ) + self.avoidance()
                }
                None => Vec2::ZERO,
            },
            NavigatorMode::Wander => {
                let params = WanderParams {
                    radius: cfg.wander_radius,
                    distance: cfg.wander_distance,
                    jitter: cfg.wander_jitter,
                };
                let roam = steering::wander(self.heading, &mut self.wander_state, &params, &mut self.rng);
                roam + self.avoidance()
            }
            NavigatorMode::Flee => match self.target {
                Some(threat) => steering::flee(self.position, self.velocity, threat, cfg.max_speed),
                None => Vec2::ZERO,
            },
        }
    }

    fn avoidance(&self) -> Vec2 {
        steering::avoid_obstacles(
            self.position,
            self.velocity,
            &self.obstacles,
            self.config.agent_radius,
            self.config.avoidance_range,
            self.config.avoidance_weight,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn nav_at(x: f32, z: f32) -> Navigator {
        Navigator::new(NavigatorConfig::default(), Vec3::new(x, 0.0, z))
    }

    fn run(nav: &mut Navigator, frames: usize) {
        for _ in 0..frames {
            nav.update(DT);
        }
    }

    #[test]
    fn idle_holds_still() {
        let mut nav = nav_at(1.0, 2.0);
        run(&mut nav, 60);
        assert_eq!(nav.ground_position(), Vec2::new(1.0, 2.0));
        assert_eq!(nav.velocity(), Vec2::ZERO);
        assert_eq!(nav.steering_force(), Vec2::ZERO);
    }

    #[test]
    fn move_to_arrives_and_reverts_to_idle() {
        let mut nav = nav_at(0.0, 0.0);
        nav.move_to(8.0, 5.0);
        let mut frames = 0;
        while !nav.has_arrived() && frames < 2000 {
            nav.update(DT);
            frames += 1;
        }
        assert!(nav.has_arrived(), "did not arrive after {frames} frames");
        assert_eq!(nav.mode(), NavigatorMode::Idle);
        assert!(nav.target().is_none());
        assert_eq!(nav.steering_force(), Vec2::ZERO);
        assert!(nav.ground_position().distance(&Vec2::new(8.0, 5.0)) < 0.4);
    }

    #[test]
    fn move_to_arrives_from_every_direction() {
        for (x, z) in [(6.0, 0.0), (-6.0, 0.0), (0.0, 6.0), (0.0, -6.0), (-4.0, 4.5)] {
            let mut nav = nav_at(0.0, 0.0);
            nav.move_to(x, z);
            run(&mut nav, 1500);
            assert!(nav.has_arrived(), "target ({x}, {z})");
        }
    }

    #[test]
    fn new_command_clears_arrival() {
        let mut nav = nav_at(0.0, 0.0);
        nav.move_to(1.0, 0.0);
        run(&mut nav, 600);
        assert!(nav.has_arrived());
        nav.move_to(3.0, 0.0);
        assert!(!nav.has_arrived());
        assert_eq!(nav.mode(), NavigatorMode::MoveTo);
    }

    #[test]
    fn wander_keeps_steering_and_never_arrives() {
        let mut nav = nav_at(0.0, 0.0);
        nav.constrain_to(RoomBounds::new(0.0, 0.0, 12.0, 12.0));
        nav.wander();
        for frame in 0..3000 {
            nav.update(DT);
            assert!(!nav.has_arrived());
            assert!(nav.steering_force().length() > 0.0, "frame {frame}");
            let p = nav.ground_position();
            assert!(p.x.abs() <= 6.0 && p.z.abs() <= 6.0, "escaped bounds: {p:?}");
        }
        assert_eq!(nav.mode(), NavigatorMode::Wander);
    }

    #[test]
    fn follow_never_arrives_on_its_own() {
        let mut nav = nav_at(0.0, 0.0);
        nav.follow(2.0, 0.0);
        run(&mut nav, 600);
        assert!(!nav.has_arrived());
        assert_eq!(nav.mode(), NavigatorMode::Follow);
        assert!(nav.ground_position().distance(&Vec2::new(2.0, 0.0)) < 0.4);
        nav.follow(2.0, 4.0);
        run(&mut nav, 600);
        assert!(nav.ground_position().distance(&Vec2::new(2.0, 4.0)) < 0.4);
    }

    #[test]
    fn flee_increases_distance() {
        let mut nav = nav_at(1.0, 0.0);
        nav.flee(0.0, 0.0);
        run(&mut nav, 120);
        assert!(nav.ground_position().x > 3.0);
    }

    #[test]
    fn bounds_clamp_stalls_against_wall() {
        let mut nav = nav_at(0.0, 0.0);
        nav.constrain_to(RoomBounds::new(0.0, 0.0, 4.0, 4.0));
        nav.move_to(10.0, 0.0);
        run(&mut nav, 600);
        let p = nav.ground_position();
        assert!((p.x - 1.7).abs() < 0.01, "x={}", p.x);
        assert_eq!(nav.velocity().x, 0.0);
        assert!(!nav.has_arrived());
    }

    #[test]
    fn walkability_gate_keeps_agent_out_of_pit() {
        let in_pit = |x: f32, z: f32| (4.0..=6.0).contains(&x) && (-1.0..=1.0).contains(&z);
        let mut nav = nav_at(0.0, 0.0);
        nav.set_walkability(Some(Box::new(move |x, z| !in_pit(x, z))));
        nav.move_to(5.0, 0.0);
        for _ in 0..1200 {
            nav.update(DT);
            let p = nav.ground_position();
            assert!(!in_pit(p.x, p.z), "entered pit at {p:?}");
        }
        assert!(!nav.has_arrived());
    }

    #[test]
    fn heading_follows_velocity_except_after_teleport() {
        let mut nav = nav_at(0.0, 0.0);
        nav.move_to(10.0, 0.0);
        run(&mut nav, 30);
        assert!((nav.heading() - std::f32::consts::FRAC_PI_2).abs() < 0.01);
        nav.teleport(0.0, 0.0, Some(1.0));
        assert_eq!(nav.heading(), 1.0);
        assert_eq!(nav.velocity(), Vec2::ZERO);
    }

    #[test]
    fn ground_height_strategy_drives_elevation() {
        let mut nav = nav_at(0.0, 0.0);
        nav.set_ground_height(Some(Box::new(|x, _| x * 0.5)));
        nav.move_to(4.0, 0.0);
        run(&mut nav, 600);
        let p = nav.position();
        assert!((p.y - p.x * 0.5).abs() < 0.001);
    }

    #[test]
    fn avoidance_skirts_obstacle_beside_route() {
        let mut nav = nav_at(0.0, 0.0);
        nav.set_obstacles(vec![Obstacle::new(4.0, 1.2, 0.5)]);
        nav.move_to(8.0, 0.0);
        let mut closest = f32::MAX;
        for _ in 0..1500 {
            nav.update(DT);
            closest = closest.min(nav.ground_position().distance(&Vec2::new(4.0, 1.2)));
        }
        assert!(nav.has_arrived());
        assert!(closest > 0.5, "clipped obstacle: {closest}");
    }

    #[test]
    fn follow_steers_around_obstacles() {
        let mut nav = nav_at(0.0, 0.0);
        nav.set_obstacles(vec![Obstacle::new(4.0, 1.2, 0.5)]);
        nav.follow(8.0, 0.0);
        let mut min_z = 0.0_f32;
        for _ in 0..1500 {
            nav.update(DT);
            min_z = min_z.min(nav.ground_position().z);
        }
        // a straight chase along z = 0 would never leave the axis
        assert!(min_z < -0.01, "not deflected: {min_z}");
        assert_eq!(nav.mode(), NavigatorMode::Follow);
        assert!(nav.ground_position().distance(&Vec2::new(8.0, 0.0)) < 0.4);
    }
}
