use super::input::{ActionStates, InputAction, PointerEvent};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn distance_to(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// World space is measured in pixels with +y pointing down, the same
/// orientation the pointer reports. The camera position is the world point
/// rendered at the window center.
#[derive(Debug, Clone, Copy, Default)]
pub struct Camera2D {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transform {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainKind {
    Water,
    Land,
}

/// Discrete cell coordinate, kept inside `[0, size)` by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TerrainGridError {
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("cell size must be positive and finite, got {cell_size_px}")]
    InvalidCellSize { cell_size_px: f32 },
}

/// Square grid of terrain kinds with a closed boundary: every coordinate
/// outside `[0, size)` reads as `Water`. The grid also owns the cell-to-world
/// mapping; the center of cell (x, y) is `((x + 0.5), (y + 0.5)) * cell_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    size: u32,
    cell_size_px: f32,
    cells: Vec<TerrainKind>,
}

impl TerrainGrid {
    pub fn new(
        size: u32,
        cell_size_px: f32,
        cells: Vec<TerrainKind>,
    ) -> Result<Self, TerrainGridError> {
        let expected = size as usize * size as usize;
        let actual = cells.len();
        if expected != actual {
            return Err(TerrainGridError::CellCountMismatch { expected, actual });
        }
        if !cell_size_px.is_finite() || cell_size_px <= 0.0 {
            return Err(TerrainGridError::InvalidCellSize { cell_size_px });
        }
        Ok(Self {
            size,
            cell_size_px,
            cells,
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn cell_size_px(&self) -> f32 {
        self.cell_size_px
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size || y >= self.size {
            return None;
        }
        Some(y as usize * self.size as usize + x as usize)
    }

    pub fn kind_at(&self, x: i32, y: i32) -> TerrainKind {
        if x < 0 || y < 0 {
            return TerrainKind::Water;
        }
        self.index_of(x as u32, y as u32)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(TerrainKind::Water)
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.kind_at(x, y) == TerrainKind::Land
    }

    /// A legal transition is to an in-bounds, walkable cell that is an
    /// orthogonal neighbor of `from`: exactly one axis differs, by one.
    pub fn can_move(&self, from: GridPos, to_x: i32, to_y: i32) -> bool {
        let dx = (to_x - from.x as i32).abs();
        let dy = (to_y - from.y as i32).abs();
        let orthogonal_step = dx + dy == 1;
        orthogonal_step && self.is_walkable(to_x, to_y)
    }

    pub fn cell_center(&self, cell: GridPos) -> Vec2 {
        Vec2 {
            x: (cell.x as f32 + 0.5) * self.cell_size_px,
            y: (cell.y as f32 + 0.5) * self.cell_size_px,
        }
    }

    /// Nearest in-bounds cell containing the world point. Positions slightly
    /// outside the grid clamp to the edge cell rather than failing; callers
    /// re-derive cell coordinates only at arrival events, where the position
    /// is already within an epsilon of a real cell center.
    pub fn cell_containing(&self, world: Vec2) -> GridPos {
        let x = (world.x / self.cell_size_px).floor() as i32;
        let y = (world.y / self.cell_size_px).floor() as i32;
        self.clamp_cell(x, y)
    }

    pub fn clamp_cell(&self, x: i32, y: i32) -> GridPos {
        let limit = self.size.saturating_sub(1) as i32;
        GridPos {
            x: x.clamp(0, limit) as u32,
            y: y.clamp(0, limit) as u32,
        }
    }

    pub fn land_cell_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|kind| **kind == TerrainKind::Land)
            .count()
    }
}

/// Continuous motion state. `target.is_some()` is the single source of truth
/// for "a move is in flight"; there is no separate flag to drift out of sync.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub velocity: Vec2,
    pub target: Option<Vec2>,
}

impl Kinematics {
    pub fn moving(&self) -> bool {
        self.target.is_some()
    }

    pub fn stop(&mut self) {
        self.velocity = Vec2::default();
        self.target = None;
    }

    /// One integration step. The step is clamped so a fast mover lands on its
    /// target instead of oscillating past it; with no target the position is
    /// returned unchanged.
    pub fn advance(&self, position: Vec2, fixed_dt_seconds: f32) -> Vec2 {
        let Some(target) = self.target else {
            return position;
        };
        let step = Vec2 {
            x: self.velocity.x * fixed_dt_seconds,
            y: self.velocity.y * fixed_dt_seconds,
        };
        let step_length = (step.x * step.x + step.y * step.y).sqrt();
        if step_length >= position.distance_to(target) {
            return target;
        }
        Vec2 {
            x: position.x + step.x,
            y: position.y + step.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Seed,
    Coin,
    Shell,
}

impl ItemKind {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Coin => "coin",
            Self::Shell => "shell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collectible {
    pub kind: ItemKind,
    pub cell: GridPos,
    pub collected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Square,
    Circle,
    Diamond,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderableKind {
    Shape { shape: ShapeKind, color: [u8; 4] },
    Sprite { key: String },
}

#[derive(Debug, Clone)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMarkerKind {
    Blocked,
    Pickup,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackMarker {
    pub kind: FeedbackMarkerKind,
    pub position_world: Vec2,
    pub ttl_seconds: f32,
}

#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    pointer_events: Vec<PointerEvent>,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        pointer_events: Vec<PointerEvent>,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            pointer_events,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn pointer_events(&self) -> &[PointerEvent] {
        &self.pointer_events
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_pointer_events(mut self, pointer_events: Vec<PointerEvent>) -> Self {
        self.pointer_events = pointer_events;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
    pub grid_pos: Option<GridPos>,
    pub kinematics: Option<Kinematics>,
    pub collectible: Option<Collectible>,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    camera: Camera2D,
    terrain: Option<TerrainGrid>,
    feedback_markers: Vec<FeedbackMarker>,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        self.spawn_internal(transform, renderable, false)
    }

    /// Spawn an entity that carries grid-locked movement state. The grid
    /// coordinate starts at the cell containing the spawn position once a
    /// terrain grid is present, else (0, 0); the caller refines it on load.
    pub fn spawn_mover(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        self.spawn_internal(transform, renderable, true)
    }

    fn spawn_internal(
        &mut self,
        transform: Transform,
        renderable: RenderableDesc,
        mover: bool,
    ) -> EntityId {
        let id = self.allocator.allocate();
        let grid_pos = mover.then(|| {
            self.terrain
                .as_ref()
                .map(|grid| grid.cell_containing(transform.position))
                .unwrap_or_default()
        });
        self.pending_spawns.push(Entity {
            id,
            transform,
            renderable,
            grid_pos,
            kinematics: mover.then(Kinematics::default),
            collectible: None,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.camera = Camera2D::default();
        self.feedback_markers.clear();
    }

    pub fn set_terrain(&mut self, terrain: TerrainGrid) {
        self.terrain = Some(terrain);
    }

    pub fn terrain(&self) -> Option<&TerrainGrid> {
        self.terrain.as_ref()
    }

    pub fn clear_terrain(&mut self) {
        self.terrain = None;
    }

    pub fn push_feedback_marker(&mut self, marker: FeedbackMarker) {
        self.feedback_markers.push(marker);
    }

    pub fn feedback_markers(&self) -> &[FeedbackMarker] {
        &self.feedback_markers
    }

    pub fn tick_feedback_markers(&mut self, fixed_dt_seconds: f32) {
        self.feedback_markers.retain_mut(|marker| {
            marker.ttl_seconds -= fixed_dt_seconds;
            marker.ttl_seconds > 0.0
        });
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Split borrow for the per-tick systems: read the terrain while mutating
    /// entities, without cloning the grid.
    pub fn terrain_and_entities_mut(&mut self) -> (Option<&TerrainGrid>, &mut [Entity]) {
        (self.terrain.as_ref(), &mut self.entities)
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn live_collectibles(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|entity| {
            entity
                .collectible
                .is_some_and(|collectible| !collectible.collected)
        })
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn render(&mut self, world: &SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Reset,
}

pub(crate) struct SceneHost {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneHost {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub(crate) fn apply_pending(&mut self) {
        self.world.apply_pending();
    }

    /// Tear the scene down and rebuild it from scratch: the world is cleared
    /// (entities, camera, markers) and `load` runs again. The terrain grid
    /// survives `clear` and is replaced by `load`.
    pub(crate) fn reset(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn render(&mut self) {
        self.scene.render(&self.world);
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut SceneWorld {
        &mut self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }
}
