//! Lock-aware BFS pathfinding over the room connectivity graph.
//!
//! `RoomPathfinder` takes ownership of one stage's [`RoomGraph`], builds an
//! adjacency list once (both directions of every horizontal connection, then
//! every vertical one, in declared order) and answers shortest-hop queries.
//! Nothing is cached between queries; room counts per stage are small.
//!
//! The set of opened locks only grows. It is shared by every character
//! querying the same pathfinder, so a door opened by one is open for all.
//! On a layout change, build a new pathfinder instead of mutating this one.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::bounds::RoomBounds;
use crate::error::PathError;
use crate::graph::{Room, RoomGraph};
use crate::math::Vec3;

/// What a waypoint marks along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Doorway,
    Destination,
    StairsEntry,
    StairsExit,
}

/// A world-space point to walk to, tagged with the room it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub room_id: String,
    pub kind: WaypointKind,
}

impl Waypoint {
    fn at(pos: Vec3, room_id: &str, kind: WaypointKind) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            room_id: room_id.to_string(),
            kind,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A route through the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPath {
    /// Room ids from start to goal, inclusive.
    pub rooms: Vec<String>,
    pub waypoints: Vec<Waypoint>,
    /// Straight-line length of the waypoint polyline. Diagnostic only.
    pub distance_estimate: f32,
}

#[derive(Debug, Clone, Copy)]
enum EdgeLink {
    Horizontal(usize),
    Vertical(usize),
}

#[derive(Debug, Clone)]
struct Edge {
    to: String,
    lock_id: Option<String>,
    link: EdgeLink,
}

/// Pathfinder over one stage's room graph.
pub struct RoomPathfinder {
    graph: RoomGraph,
    /// room_id → outgoing edges in insertion order
    adj: HashMap<String, Vec<Edge>>,
    opened_locks: HashSet<String>,
}

impl RoomPathfinder {
    /// Build the adjacency structure for a graph snapshot.
    pub fn new(graph: RoomGraph) -> Self {
        let mut adj: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut link = |a: &str, b: &str, lock: &Option<String>, kind: EdgeLink| {
            adj.entry(a.to_string()).or_default().push(Edge {
                to: b.to_string(),
                lock_id: lock.clone(),
                link: kind,
            });
            adj.entry(b.to_string()).or_default().push(Edge {
                to: a.to_string(),
                lock_id: lock.clone(),
                link: kind,
            });
        };

        for (i, conn) in graph.connections().iter().enumerate() {
            link(&conn.from_room, &conn.to_room, &conn.lock_id, EdgeLink::Horizontal(i));
        }
        for (i, conn) in graph.vertical_connections().iter().enumerate() {
            link(&conn.upper_room, &conn.lower_room, &conn.lock_id, EdgeLink::Vertical(i));
        }

        for room_id in adj.keys() {
            if !graph.has_room(room_id) {
                tracing::warn!(room = %room_id, "connection references a room missing from the graph");
            }
        }

        Self {
            graph,
            adj,
            opened_locks: HashSet::new(),
        }
    }

    pub fn graph(&self) -> &RoomGraph {
        &self.graph
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.graph.room(room_id)
    }

    pub fn room_bounds(&self, room_id: &str) -> Option<RoomBounds> {
        self.graph.room(room_id).map(Room::bounds)
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.graph.has_room(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.graph.rooms().len()
    }

    /// Every neighbor of a room, locked or not, in adjacency order.
    pub fn neighbors(&self, room_id: &str) -> Vec<&str> {
        self.adj
            .get(room_id)
            .map(|edges| edges.iter().map(|e| e.to.as_str()).collect())
            .unwrap_or_default()
    }

    /// Find a route, or `None` if an endpoint is unknown or every route is locked.
    ///
    /// `from_pos` only feeds the distance estimate; `destination` overrides
    /// the final waypoint (target room center by default).
    pub fn find_path(
        &self,
        from: &str,
        to: &str,
        from_pos: Option<Vec3>,
        destination: Option<Vec3>,
    ) -> Option<RoomPath> {
        self.find_path_checked(from, to, from_pos, destination).ok()
    }

    /// [`RoomPathfinder::find_path`] with the failure reason kept.
    pub fn find_path_checked(
        &self,
        from: &str,
        to: &str,
        from_pos: Option<Vec3>,
        destination: Option<Vec3>,
    ) -> Result<RoomPath, PathError> {
        if from == to {
            let waypoints = self
                .final_waypoint(to, destination)
                .into_iter()
                .collect::<Vec<_>>();
            return Ok(self.finish(vec![from.to_string()], waypoints, from_pos));
        }

        for end in [from, to] {
            if !self.graph.has_room(end) {
                tracing::debug!(room = end, "path endpoint unknown");
                return Err(PathError::UnknownRoom(end.to_string()));
            }
        }

        let Some((rooms, links)) = self.bfs(from, to) else {
            tracing::debug!(from, to, "no traversable route");
            return Err(PathError::Unreachable {
                from: from.to_string(),
                to: to.to_string(),
            });
        };

        let mut waypoints = Vec::with_capacity(links.len() * 2 + 1);
        for (hop, link) in links.iter().enumerate() {
            let entered = &rooms[hop + 1];
            match *link {
                EdgeLink::Horizontal(i) => {
                    let conn = &self.graph.connections()[i];
                    match self.graph.room(&conn.from_room) {
                        Some(origin) => waypoints.push(Waypoint::at(
                            origin.position + conn.doorway_offset,
                            entered,
                            WaypointKind::Doorway,
                        )),
                        None => tracing::warn!(
                            connection = %conn.id,
                            "doorway has no resolvable position, skipping waypoint"
                        ),
                    }
                }
                EdgeLink::Vertical(i) => {
                    let conn = &self.graph.vertical_connections()[i];
                    waypoints.push(Waypoint::at(
                        conn.position,
                        &rooms[hop],
                        WaypointKind::StairsEntry,
                    ));
                    match self.graph.room(entered) {
                        Some(room) => waypoints.push(Waypoint::at(
                            room.center(),
                            entered,
                            WaypointKind::StairsExit,
                        )),
                        None => tracing::warn!(
                            connection = %conn.id,
                            room = %entered,
                            "stairs exit room missing, skipping waypoint"
                        ),
                    }
                }
            }
        }
        waypoints.extend(self.final_waypoint(to, destination));

        tracing::trace!(from, to, hops = links.len(), "path found");
        Ok(self.finish(rooms, waypoints, from_pos))
    }

    /// Open a lock for every future query. Returns `true` the first time.
    pub fn unlock_connection(&mut self, lock_id: &str) -> bool {
        let newly = self.opened_locks.insert(lock_id.to_string());
        if newly {
            tracing::debug!(lock = lock_id, "lock opened");
        }
        newly
    }

    pub fn is_unlocked(&self, lock_id: &str) -> bool {
        self.opened_locks.contains(lock_id)
    }

    pub fn opened_locks(&self) -> &HashSet<String> {
        &self.opened_locks
    }

    /// Whether every direct edge between two rooms is blocked.
    ///
    /// One open edge among parallel connections is enough to pass, matching
    /// what [`RoomPathfinder::find_path`] will cross. Rooms with no direct
    /// edge report `false`, the same as an open door.
    pub fn is_connection_locked(&self, from: &str, to: &str) -> bool {
        let Some(edges) = self.adj.get(from) else {
            return false;
        };
        let mut direct = edges.iter().filter(|e| e.to == to).peekable();
        direct.peek().is_some() && !direct.any(|e| self.traversable(e))
    }

    /// First room (declared order) whose footprint contains `(x, z)`.
    pub fn room_at_position(&self, x: f32, z: f32) -> Option<&str> {
        self.graph
            .rooms()
            .iter()
            .find(|r| r.bounds().contains(x, z, 0.0))
            .map(|r| r.id.as_str())
    }

    /// Like [`RoomPathfinder::room_at_position`], but when floors stack over
    /// the same footprint picks the room whose floor is nearest `y`.
    pub fn room_at_point(&self, x: f32, y: f32, z: f32) -> Option<&str> {
        let mut best: Option<(&Room, f32)> = None;
        for room in self.graph.rooms() {
            if !room.bounds().contains(x, z, 0.0) {
                continue;
            }
            let gap = (room.floor_height() - y).abs();
            if best.map_or(true, |(_, g)| gap < g) {
                best = Some((room, gap));
            }
        }
        best.map(|(r, _)| r.id.as_str())
    }

    fn traversable(&self, edge: &Edge) -> bool {
        match &edge.lock_id {
            None => true,
            Some(lock) => self.opened_locks.contains(lock),
        }
    }

    fn final_waypoint(&self, to: &str, destination: Option<Vec3>) -> Option<Waypoint> {
        let pos = destination.or_else(|| self.graph.room(to).map(Room::center))?;
        Some(Waypoint::at(pos, to, WaypointKind::Destination))
    }

    fn finish(&self, rooms: Vec<String>, waypoints: Vec<Waypoint>, from_pos: Option<Vec3>) -> RoomPath {
        let start = from_pos.or_else(|| {
            rooms
                .first()
                .and_then(|r| self.graph.room(r))
                .map(Room::center)
        });
        let mut distance_estimate = 0.0;
        if let Some(mut prev) = start {
            for wp in &waypoints {
                let p = wp.position();
                distance_estimate += prev.distance(&p);
                prev = p;
            }
        }
        RoomPath {
            rooms,
            waypoints,
            distance_estimate,
        }
    }

    fn bfs(&self, from: &str, to: &str) -> Option<(Vec<String>, Vec<EdgeLink>)> {
        // room → (previous room, edge used to get here)
        let mut came_from: HashMap<&str, (&str, EdgeLink)> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            let Some(edges) = self.adj.get(current) else {
                continue;
            };
            for edge in edges {
                if !self.traversable(edge) || !visited.insert(edge.to.as_str()) {
                    continue;
                }
                came_from.insert(edge.to.as_str(), (current, edge.link));
                if edge.to == to {
                    return Some(reconstruct(&came_from, from, to));
                }
                queue.push_back(edge.to.as_str());
            }
        }

        None
    }
}

fn reconstruct(
    came_from: &HashMap<&str, (&str, EdgeLink)>,
    from: &str,
    to: &str,
) -> (Vec<String>, Vec<EdgeLink>) {
    let mut rooms = vec![to.to_string()];
    let mut links = Vec::new();
    let mut node = to;
    while node != from {
        let Some(&(prev, link)) = came_from.get(node) else {
            break;
        };
        links.push(link);
        rooms.push(prev.to_string());
        node = prev;
    }
    rooms.reverse();
    links.reverse();
    (rooms, links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{door, room};
    use crate::graph::{ConnectionKind, VerticalConnection, VerticalKind};

    fn stairs(id: &str, upper: &str, lower: &str, pos: Vec3, lock: Option<&str>) -> VerticalConnection {
        VerticalConnection {
            id: id.to_string(),
            upper_room: upper.to_string(),
            lower_room: lower.to_string(),
            height_difference: 3.0,
            position: pos,
            kind: VerticalKind::Stairs,
            lock_id: lock.map(str::to_string),
        }
    }

    // a --d1-- b --d2-- c, all on the ground floor
    fn linear() -> RoomPathfinder {
        RoomPathfinder::new(RoomGraph::new(
            vec![
                room("a", 0.0, 0.0, 0.0, "entry"),
                room("b", 10.0, 0.0, 0.0, "hall"),
                room("c", 20.0, 0.0, 0.0, "exit"),
            ],
            vec![door("d1", "a", "b", 5.0, None), door("d2", "b", "c", 5.0, None)],
            vec![],
            "a",
            "c",
        ))
    }

    // a --[L1]-- b ==stairs== c (c upstairs)
    fn locked_stage() -> RoomPathfinder {
        RoomPathfinder::new(RoomGraph::new(
            vec![
                room("a", 0.0, 0.0, 0.0, "entry"),
                room("b", 10.0, 0.0, 0.0, "hall"),
                room("c", 20.0, 3.0, 0.0, "exit"),
            ],
            vec![door("d1", "a", "b", 5.0, Some("L1"))],
            vec![stairs("s1", "c", "b", Vec3::new(12.0, 0.0, 0.0), None)],
            "a",
            "c",
        ))
    }

    #[test]
    fn same_room_is_trivial() {
        let pf = linear();
        let path = pf.find_path("a", "a", None, None).unwrap();
        assert_eq!(path.rooms, vec!["a"]);
        assert_eq!(path.waypoints.len(), 1);
        assert_eq!(path.waypoints[0].kind, WaypointKind::Destination);
    }

    #[test]
    fn adjacent_rooms_get_doorway_then_destination() {
        let pf = linear();
        let path = pf.find_path("a", "b", None, None).unwrap();
        assert_eq!(path.rooms, vec!["a", "b"]);
        assert_eq!(path.waypoints.len(), 2);
        assert_eq!(path.waypoints[0].kind, WaypointKind::Doorway);
        assert_eq!(path.waypoints[0].room_id, "b");
        assert!((path.waypoints[0].x - 5.0).abs() < 0.01);
        assert_eq!(path.waypoints[1].kind, WaypointKind::Destination);
        assert!((path.waypoints[1].x - 10.0).abs() < 0.01);
    }

    #[test]
    fn doorway_offset_is_relative_to_declaring_room() {
        // Walking c → b uses d2, declared from b: world x = 10 + 5.
        let pf = linear();
        let path = pf.find_path("c", "a", None, None).unwrap();
        assert_eq!(path.rooms, vec!["c", "b", "a"]);
        assert!((path.waypoints[0].x - 15.0).abs() < 0.01);
        assert!((path.waypoints[1].x - 5.0).abs() < 0.01);
    }

    #[test]
    fn unknown_rooms_return_none() {
        let pf = linear();
        assert!(pf.find_path("a", "zz", None, None).is_none());
        assert_eq!(
            pf.find_path_checked("zz", "a", None, None),
            Err(PathError::UnknownRoom("zz".into()))
        );
    }

    #[test]
    fn every_pair_reachable_when_unlocked() {
        let pf = linear();
        for from in ["a", "b", "c"] {
            for to in ["a", "b", "c"] {
                assert!(pf.find_path(from, to, None, None).is_some(), "{from}->{to}");
            }
        }
    }

    #[test]
    fn stairs_emit_entry_and_exit() {
        let mut pf = locked_stage();
        pf.unlock_connection("L1");
        let path = pf.find_path("a", "c", None, None).unwrap();
        assert_eq!(path.rooms, vec!["a", "b", "c"]);
        let kinds: Vec<_> = path.waypoints.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![
                WaypointKind::Doorway,
                WaypointKind::StairsEntry,
                WaypointKind::StairsExit,
                WaypointKind::Destination,
            ]
        );
        assert_eq!(path.waypoints[1].room_id, "b");
        assert!((path.waypoints[1].x - 12.0).abs() < 0.01);
        assert_eq!(path.waypoints[2].room_id, "c");
        assert!((path.waypoints[2].y - 3.0).abs() < 0.01);
    }

    #[test]
    fn locked_edge_blocks_until_opened() {
        let mut pf = locked_stage();
        assert_eq!(
            pf.find_path_checked("a", "c", None, None),
            Err(PathError::Unreachable {
                from: "a".into(),
                to: "c".into()
            })
        );
        assert!(pf.unlock_connection("L1"));
        assert!(pf.find_path("a", "c", None, None).is_some());
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut pf = locked_stage();
        assert!(pf.unlock_connection("L1"));
        let first = pf.find_path("a", "c", None, None);
        assert!(!pf.unlock_connection("L1"));
        assert_eq!(pf.find_path("a", "c", None, None), first);
        assert_eq!(pf.opened_locks().len(), 1);
    }

    #[test]
    fn locking_all_incident_edges_isolates_room() {
        // b reachable from a two ways, both locked.
        let mut pf = RoomPathfinder::new(RoomGraph::new(
            vec![
                room("a", 0.0, 0.0, 0.0, ""),
                room("b", 10.0, 0.0, 0.0, ""),
                room("x", 0.0, 0.0, 10.0, ""),
            ],
            vec![
                door("ab", "a", "b", 5.0, Some("L1")),
                door("ax", "a", "x", 5.0, None),
                door("xb", "x", "b", 5.0, Some("L2")),
            ],
            vec![],
            "a",
            "b",
        ));
        assert!(pf.find_path("a", "b", None, None).is_none());
        pf.unlock_connection("L2");
        let path = pf.find_path("a", "b", None, None).unwrap();
        assert_eq!(path.rooms, vec!["a", "x", "b"]);
    }

    #[test]
    fn ties_follow_declaration_order() {
        // Two equal-length routes a→p→d and a→q→d; p's door is declared first.
        let pf = RoomPathfinder::new(RoomGraph::new(
            vec![
                room("a", 0.0, 0.0, 0.0, ""),
                room("p", 10.0, 0.0, 0.0, ""),
                room("q", 0.0, 0.0, 10.0, ""),
                room("d", 10.0, 0.0, 10.0, ""),
            ],
            vec![
                door("ap", "a", "p", 5.0, None),
                door("aq", "a", "q", 5.0, None),
                door("qd", "q", "d", 5.0, None),
                door("pd", "p", "d", 5.0, None),
            ],
            vec![],
            "a",
            "d",
        ));
        let path = pf.find_path("a", "d", None, None).unwrap();
        assert_eq!(path.rooms, vec!["a", "p", "d"]);
    }

    #[test]
    fn shortest_hop_count_wins() {
        //     a
        //    / \
        //   b   c
        //  / \
        // d   e
        let pf = RoomPathfinder::new(RoomGraph::new(
            vec![
                room("a", 0.0, 0.0, 0.0, ""),
                room("b", 10.0, 0.0, 0.0, ""),
                room("c", -10.0, 0.0, 0.0, ""),
                room("d", 10.0, 0.0, 10.0, ""),
                room("e", 20.0, 0.0, 0.0, ""),
            ],
            vec![
                door("ab", "a", "b", 5.0, None),
                door("ac", "a", "c", -5.0, None),
                door("bd", "b", "d", 0.0, None),
                door("be", "b", "e", 5.0, None),
            ],
            vec![],
            "a",
            "e",
        ));
        let path = pf.find_path("c", "e", None, None).unwrap();
        assert_eq!(path.rooms, vec!["c", "a", "b", "e"]);
    }

    #[test]
    fn is_connection_locked_reports_direct_edges_only() {
        let mut pf = locked_stage();
        assert!(pf.is_connection_locked("a", "b"));
        assert!(pf.is_connection_locked("b", "a"));
        assert!(!pf.is_connection_locked("b", "c"));
        // No direct edge reads as "not locked".
        assert!(!pf.is_connection_locked("a", "c"));
        pf.unlock_connection("L1");
        assert!(!pf.is_connection_locked("a", "b"));
    }

    #[test]
    fn open_archway_beside_locked_door_is_not_locked() {
        let mut arch = door("arch", "a", "b", 5.0, None);
        arch.kind = ConnectionKind::Archway;
        let pf = RoomPathfinder::new(RoomGraph::new(
            vec![room("a", 0.0, 0.0, 0.0, ""), room("b", 10.0, 0.0, 0.0, "")],
            vec![door("d1", "a", "b", 5.0, Some("L1")), arch],
            vec![],
            "a",
            "b",
        ));
        assert!(!pf.is_connection_locked("a", "b"));
        assert!(!pf.is_connection_locked("b", "a"));
        assert!(pf.find_path("a", "b", None, None).is_some());
    }

    #[test]
    fn missing_doorway_data_skips_waypoint() {
        // "ghost" has connections but no room entry.
        let pf = RoomPathfinder::new(RoomGraph::new(
            vec![room("a", 0.0, 0.0, 0.0, ""), room("b", 20.0, 0.0, 0.0, "")],
            vec![
                door("ag", "a", "ghost", 5.0, None),
                door("gb", "ghost", "b", 5.0, None),
            ],
            vec![],
            "a",
            "b",
        ));
        let path = pf.find_path("a", "b", None, None).unwrap();
        assert_eq!(path.rooms, vec!["a", "ghost", "b"]);
        assert_eq!(path.waypoints.len(), 2);
        assert_eq!(path.waypoints[0].kind, WaypointKind::Doorway);
        assert_eq!(path.waypoints[1].kind, WaypointKind::Destination);
    }

    #[test]
    fn supplied_destination_overrides_center() {
        let pf = linear();
        let path = pf
            .find_path("a", "b", None, Some(Vec3::new(12.0, 0.0, 2.0)))
            .unwrap();
        let last = path.waypoints.last().unwrap();
        assert!((last.x - 12.0).abs() < 0.01);
        assert!((last.z - 2.0).abs() < 0.01);
    }

    #[test]
    fn distance_estimate_follows_waypoints() {
        let pf = linear();
        let path = pf.find_path("a", "c", Some(Vec3::ZERO), None).unwrap();
        // 0 → 5 → 15 → 20 along x
        assert!((path.distance_estimate - 20.0).abs() < 0.01);
    }

    #[test]
    fn room_lookup_by_position() {
        let pf = locked_stage();
        assert_eq!(pf.room_at_position(1.0, 1.0), Some("a"));
        assert_eq!(pf.room_at_position(11.0, -2.0), Some("b"));
        assert_eq!(pf.room_at_position(100.0, 0.0), None);
    }

    #[test]
    fn room_at_point_prefers_nearest_floor() {
        let pf = RoomPathfinder::new(RoomGraph::new(
            vec![
                room("ground", 0.0, 0.0, 0.0, ""),
                room("upper", 0.0, 3.0, 0.0, ""),
            ],
            vec![],
            vec![],
            "ground",
            "upper",
        ));
        assert_eq!(pf.room_at_position(0.0, 0.0), Some("ground"));
        assert_eq!(pf.room_at_point(0.0, 2.9, 0.0), Some("upper"));
        assert_eq!(pf.room_at_point(0.0, 0.2, 0.0), Some("ground"));
    }

    #[test]
    fn neighbors_include_locked_edges() {
        let pf = locked_stage();
        assert_eq!(pf.neighbors("b"), vec!["a", "c"]);
        assert!(pf.neighbors("nowhere").is_empty());
        assert_eq!(pf.room_count(), 3);
    }
}
