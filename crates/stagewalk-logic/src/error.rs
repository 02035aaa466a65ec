//! Error types for graph loading, path queries, and configuration.
//!
//! None of these escape the per-frame update paths: the planner folds path
//! failures into `waiting`/`wandering`, and graph/config errors only surface
//! at load time.

/// Problems found while loading or validating a room graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The JSON document could not be parsed into a graph.
    #[error("room graph parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two rooms share an id.
    #[error("duplicate room id '{0}'")]
    DuplicateRoom(String),

    /// A connection references a room that does not exist.
    #[error("connection '{connection}' references unknown room '{room}'")]
    DanglingConnection { connection: String, room: String },

    /// The designated entry room does not exist.
    #[error("entry room '{0}' does not exist")]
    UnknownEntryRoom(String),

    /// The designated exit room does not exist.
    #[error("exit room '{0}' does not exist")]
    UnknownExitRoom(String),

    /// A room has zero or negative footprint.
    #[error("room '{id}' has non-positive footprint {width}x{depth}")]
    DegenerateRoom { id: String, width: f32, depth: f32 },
}

/// Why a room path could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path endpoint is absent from the graph.
    #[error("unknown room '{0}'")]
    UnknownRoom(String),

    /// Every route between the endpoints is currently locked.
    #[error("no traversable route from '{from}' to '{to}'")]
    Unreachable { from: String, to: String },
}

/// Problems with navigator/planner tuning.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
