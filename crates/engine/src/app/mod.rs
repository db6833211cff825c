mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::{InputAction, PointerEvent, POINTER_QUEUE_CAPACITY};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{screen_to_world_px, world_to_screen_px, Renderer, Viewport};
pub use scene::{
    Camera2D, Collectible, Entity, EntityId, EntityIdAllocator, FeedbackMarker, FeedbackMarkerKind,
    GridPos, InputSnapshot, ItemKind, Kinematics, RenderableDesc, RenderableKind, Scene,
    SceneCommand, SceneWorld, ShapeKind, TerrainGrid, TerrainGridError, TerrainKind, Transform,
    Vec2,
};
