use std::collections::{HashSet, VecDeque};

use engine::{
    Collectible, Entity, EntityId, FeedbackMarker, FeedbackMarkerKind, GridPos, InputAction,
    InputSnapshot, ItemKind, Kinematics, PointerEvent, RenderableDesc, RenderableKind, Scene,
    SceneCommand, SceneWorld, ShapeKind, TerrainGrid, TerrainKind, Transform, Vec2,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::config::{GameConfig, ItemSpawnConfig, TerrainConfig};

const DRAG_THRESHOLD_PX: f32 = 8.0;
const ARRIVAL_EPSILON_PX: f32 = 3.0;
const BLOCKED_MARKER_TTL_SECONDS: f32 = 0.6;
const PICKUP_MARKER_TTL_SECONDS: f32 = 0.45;
const PLACEMENT_ATTEMPTS_PER_REQUESTED_ITEM: u32 = 10;
const RADIAL_GROWTH_BASE_PROBABILITY: f32 = 0.3;
const EDGE_EROSION_STRENGTH: f32 = 0.8;
const FALLBACK_DISK_RADIUS_RATIO: f32 = 0.35;
const DEFAULT_CELL_SIZE_PX: f32 = 24.0;
const PLAYER_COLOR: [u8; 4] = [236, 240, 245, 255];

include!("types.rs");
include!("terrain.rs");
include!("movement.rs");
include!("items.rs");
include!("scene_impl.rs");

pub(crate) fn build_island_scene(config: GameConfig) -> Box<dyn Scene> {
    Box::new(IslandScene::new(config))
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
