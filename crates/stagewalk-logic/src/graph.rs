//! Room graph: the immutable per-stage snapshot of rooms and connections.
//!
//! Produced by the external layout generator and consumed read-only here.
//! Rooms and connections are kept in declared order; that order drives
//! adjacency insertion in the pathfinder and therefore BFS tie-breaking.
//!
//! ```
//! use stagewalk_logic::graph::RoomGraph;
//!
//! let json = r#"{
//!     "rooms": [
//!         { "id": "hall", "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
//!           "width": 8.0, "depth": 8.0, "purpose": "entry" },
//!         { "id": "study", "position": { "x": 8.0, "y": 0.0, "z": 0.0 },
//!           "width": 8.0, "depth": 8.0, "purpose": "study" }
//!     ],
//!     "connections": [
//!         { "id": "d1", "from_room": "hall", "to_room": "study", "direction": "east",
//!           "doorway_offset": { "x": 4.0, "y": 0.0, "z": 0.0 }, "kind": "door" }
//!     ],
//!     "entry_room": "hall",
//!     "exit_room": "study"
//! }"#;
//! let graph = RoomGraph::from_json(json).unwrap();
//! assert!(graph.validate().is_ok());
//! assert_eq!(graph.rooms_with_purpose("study").count(), 1);
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::bounds::RoomBounds;
use crate::error::GraphError;
use crate::math::Vec3;

/// A room on one floor of the stage.
///
/// `position` is the center of the footprint at floor height, so `position.y`
/// is the room's authoritative floor elevation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
    #[serde(default)]
    pub level: i32,
    /// Free-form semantic tag ("kitchen", "entry", ...). Scene ids match this.
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub quest_items: Vec<String>,
    #[serde(default)]
    pub story_beats: Vec<String>,
    /// Ids of the connections touching this room.
    #[serde(default)]
    pub connections: Vec<String>,
}

impl Room {
    pub fn bounds(&self) -> RoomBounds {
        RoomBounds::new(self.position.x, self.position.z, self.width, self.depth)
    }

    pub fn center(&self) -> Vec3 {
        self.position
    }

    pub fn floor_height(&self) -> f32 {
        self.position.y
    }

    pub fn has_quest_item(&self, item_id: &str) -> bool {
        self.quest_items.iter().any(|i| i == item_id)
    }

    pub fn has_story_beat(&self, beat_id: &str) -> bool {
        self.story_beats.iter().any(|b| b == beat_id)
    }
}

/// Compass side of `from_room` a horizontal connection leaves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Physical form of a horizontal connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Door,
    Archway,
    Stairs,
    Ramp,
    Open,
    /// Scripted transition (e.g. a loading corridor between wings).
    LoadingTransition,
}

/// Physical form of a vertical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalKind {
    Stairs,
    Ramp,
}

/// Same-floor connection between two rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizontalConnection {
    pub id: String,
    pub from_room: String,
    pub to_room: String,
    pub direction: Direction,
    /// Doorway position relative to `from_room`'s world position.
    pub doorway_offset: Vec3,
    pub kind: ConnectionKind,
    #[serde(default)]
    pub lock_id: Option<String>,
}

/// Floor-to-floor connection (stairs or ramp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalConnection {
    #[serde(default)]
    pub id: String,
    pub upper_room: String,
    pub lower_room: String,
    pub height_difference: f32,
    /// Absolute world position of the transition volume.
    pub position: Vec3,
    pub kind: VerticalKind,
    #[serde(default)]
    pub lock_id: Option<String>,
}

#[derive(Deserialize)]
struct RawRoomGraph {
    rooms: Vec<Room>,
    #[serde(default)]
    connections: Vec<HorizontalConnection>,
    #[serde(default)]
    vertical_connections: Vec<VerticalConnection>,
    entry_room: String,
    exit_room: String,
}

impl From<RawRoomGraph> for RoomGraph {
    fn from(raw: RawRoomGraph) -> Self {
        RoomGraph::new(
            raw.rooms,
            raw.connections,
            raw.vertical_connections,
            raw.entry_room,
            raw.exit_room,
        )
    }
}

/// All rooms of a stage plus both connection kinds and the entry/exit ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawRoomGraph")]
pub struct RoomGraph {
    rooms: Vec<Room>,
    connections: Vec<HorizontalConnection>,
    vertical_connections: Vec<VerticalConnection>,
    entry_room: String,
    exit_room: String,
    /// room id → index into `rooms` (first occurrence wins)
    #[serde(skip_serializing)]
    index: HashMap<String, usize>,
}

impl RoomGraph {
    pub fn new(
        rooms: Vec<Room>,
        connections: Vec<HorizontalConnection>,
        vertical_connections: Vec<VerticalConnection>,
        entry_room: impl Into<String>,
        exit_room: impl Into<String>,
    ) -> Self {
        let mut index = HashMap::with_capacity(rooms.len());
        for (i, room) in rooms.iter().enumerate() {
            index.entry(room.id.clone()).or_insert(i);
        }
        Self {
            rooms,
            connections,
            vertical_connections,
            entry_room: entry_room.into(),
            exit_room: exit_room.into(),
            index,
        }
    }

    /// Parse a graph from its JSON form. Does not validate; see [`RoomGraph::validate`].
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let graph: RoomGraph = serde_json::from_str(json)?;
        tracing::info!(
            rooms = graph.rooms.len(),
            connections = graph.connections.len(),
            vertical = graph.vertical_connections.len(),
            "room graph loaded"
        );
        Ok(graph)
    }

    /// Check the structural invariants the layout generator is expected to
    /// uphold. Room overlap is not checked.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.index.len() != self.rooms.len() {
            let mut seen = HashSet::new();
            for room in &self.rooms {
                if !seen.insert(room.id.as_str()) {
                    return Err(GraphError::DuplicateRoom(room.id.clone()));
                }
            }
        }
        for room in &self.rooms {
            if room.width <= 0.0 || room.depth <= 0.0 {
                return Err(GraphError::DegenerateRoom {
                    id: room.id.clone(),
                    width: room.width,
                    depth: room.depth,
                });
            }
        }
        for conn in &self.connections {
            for end in [&conn.from_room, &conn.to_room] {
                if !self.index.contains_key(end) {
                    return Err(GraphError::DanglingConnection {
                        connection: conn.id.clone(),
                        room: end.clone(),
                    });
                }
            }
        }
        for conn in &self.vertical_connections {
            for end in [&conn.upper_room, &conn.lower_room] {
                if !self.index.contains_key(end) {
                    return Err(GraphError::DanglingConnection {
                        connection: conn.id.clone(),
                        room: end.clone(),
                    });
                }
            }
        }
        if !self.index.contains_key(&self.entry_room) {
            return Err(GraphError::UnknownEntryRoom(self.entry_room.clone()));
        }
        if !self.index.contains_key(&self.exit_room) {
            return Err(GraphError::UnknownExitRoom(self.exit_room.clone()));
        }
        Ok(())
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.index.get(id).map(|&i| &self.rooms[i])
    }

    pub fn has_room(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn connections(&self) -> &[HorizontalConnection] {
        &self.connections
    }

    pub fn vertical_connections(&self) -> &[VerticalConnection] {
        &self.vertical_connections
    }

    pub fn entry_room(&self) -> &str {
        &self.entry_room
    }

    pub fn exit_room(&self) -> &str {
        &self.exit_room
    }

    /// Rooms whose purpose tag equals `purpose`, in declared order.
    pub fn rooms_with_purpose<'a>(&'a self, purpose: &'a str) -> impl Iterator<Item = &'a Room> {
        self.rooms.iter().filter(move |r| r.purpose == purpose)
    }

    /// Bounds covering every room footprint on every floor.
    pub fn layout_bounds(&self) -> Option<RoomBounds> {
        let mut rooms = self.rooms.iter();
        let first = rooms.next()?.bounds();
        Some(rooms.fold(first, |acc, r| acc.union(&r.bounds())))
    }
}
