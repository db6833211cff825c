use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{
    Camera2D, Entity, FeedbackMarkerKind, RenderableKind, SceneWorld, ShapeKind, TerrainGrid,
    TerrainKind,
};
use crate::sprite_keys::validate_sprite_key;

use super::transform::world_to_screen_px;
use super::Viewport;

const CLEAR_COLOR: [u8; 4] = [12, 24, 44, 255];
const WATER_COLOR: [u8; 4] = [38, 84, 142, 255];
const LAND_COLOR: [u8; 4] = [92, 150, 74, 255];
const PLACEHOLDER_COLOR: [u8; 4] = [220, 220, 240, 255];
const BLOCKED_MARKER_COLOR: [u8; 4] = [235, 84, 74, 255];
const PICKUP_MARKER_COLOR: [u8; 4] = [250, 214, 96, 255];
const BLOCKED_MARKER_HALF_SIZE_PX: i32 = 6;
const PICKUP_MARKER_HALF_SIZE_PX: i32 = 9;
const VIEW_CULL_PADDING_PX: f32 = 16.0;
const DEFAULT_SHAPE_HALF_SIZE_PX: i32 = 6;
const SHAPE_HALF_SIZE_CELL_FRACTION: f32 = 0.35;

#[derive(Debug, Clone, Copy)]
struct WorldBounds {
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRectInclusive {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_root: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
    draw_order_scratch: Vec<usize>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            asset_root,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
            draw_order_scratch: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        let width = self.viewport.width;
        let height = self.viewport.height;
        let asset_root = self.asset_root.as_path();
        let sprite_cache = &mut self.sprite_cache;
        let warned_missing_sprite_keys = &mut self.warned_missing_sprite_keys;
        let frame = self.pixels.frame_mut();

        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        let shape_half_size = world
            .terrain()
            .map(|grid| entity_shape_half_size_px(grid.cell_size_px()))
            .unwrap_or(DEFAULT_SHAPE_HALF_SIZE_PX);

        if let Some(grid) = world.terrain() {
            draw_terrain(frame, width, height, world.camera(), grid);
        }

        collect_draw_order_movers_last(world.entities(), &mut self.draw_order_scratch);
        for entity_index in self.draw_order_scratch.iter().copied() {
            let entity = &world.entities()[entity_index];
            let (cx, cy) = world_to_screen_px(
                world.camera(),
                (width, height),
                entity.transform.position,
            );
            match &entity.renderable.kind {
                RenderableKind::Shape { shape, color } => {
                    draw_shape(frame, width, height, cx, cy, *shape, shape_half_size, *color);
                }
                RenderableKind::Sprite { key } => {
                    if let Some(sprite) = resolve_cached_sprite(
                        sprite_cache,
                        warned_missing_sprite_keys,
                        asset_root,
                        key,
                    ) {
                        draw_sprite_centered(frame, width, height, cx, cy, sprite);
                    } else {
                        draw_square(
                            frame,
                            width,
                            height,
                            cx,
                            cy,
                            shape_half_size,
                            PLACEHOLDER_COLOR,
                        );
                    }
                }
            }
        }

        for marker in world.feedback_markers() {
            let (cx, cy) =
                world_to_screen_px(world.camera(), (width, height), marker.position_world);
            match marker.kind {
                FeedbackMarkerKind::Blocked => draw_cross(
                    frame,
                    width,
                    height,
                    cx,
                    cy,
                    BLOCKED_MARKER_HALF_SIZE_PX,
                    BLOCKED_MARKER_COLOR,
                ),
                FeedbackMarkerKind::Pickup => draw_square_outline(
                    frame,
                    width,
                    height,
                    cx,
                    cy,
                    PICKUP_MARKER_HALF_SIZE_PX,
                    PICKUP_MARKER_COLOR,
                ),
            }
        }

        self.pixels.render()
    }
}

fn entity_shape_half_size_px(cell_size_px: f32) -> i32 {
    ((cell_size_px * SHAPE_HALF_SIZE_CELL_FRACTION).round() as i32).max(1)
}

/// Items and scenery draw in spawn order; movers draw last so the player is
/// never hidden under the item it is about to collect.
fn collect_draw_order_movers_last(entities: &[Entity], out: &mut Vec<usize>) {
    out.clear();
    out.extend(
        entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.kinematics.is_none())
            .map(|(index, _)| index),
    );
    out.extend(
        entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.kinematics.is_some())
            .map(|(index, _)| index),
    );
}

fn draw_terrain(frame: &mut [u8], width: u32, height: u32, camera: &Camera2D, grid: &TerrainGrid) {
    let bounds = view_bounds_world(camera, (width, height), VIEW_CULL_PADDING_PX);
    let Some(visible) = visible_tile_rect(grid, &bounds) else {
        return;
    };
    let half_size = ((grid.cell_size_px() / 2.0).round() as i32).max(1);

    for y in visible.y_min..=visible.y_max {
        for x in visible.x_min..=visible.x_max {
            let color = match grid.kind_at(x as i32, y as i32) {
                TerrainKind::Water => WATER_COLOR,
                TerrainKind::Land => LAND_COLOR,
            };
            let center = grid.cell_center(crate::app::GridPos { x, y });
            let (cx, cy) = world_to_screen_px(camera, (width, height), center);
            draw_square(frame, width, height, cx, cy, half_size, color);
        }
    }
}

fn view_bounds_world(camera: &Camera2D, window_size: (u32, u32), padding_px: f32) -> WorldBounds {
    let half_w = window_size.0 as f32 * 0.5;
    let half_h = window_size.1 as f32 * 0.5;
    let padding = padding_px.max(0.0);

    WorldBounds {
        min_x: camera.position.x - half_w - padding,
        max_x: camera.position.x + half_w + padding,
        min_y: camera.position.y - half_h - padding,
        max_y: camera.position.y + half_h + padding,
    }
}

fn visible_tile_rect(grid: &TerrainGrid, bounds: &WorldBounds) -> Option<TileRectInclusive> {
    if grid.size() == 0 {
        return None;
    }

    let cell = grid.cell_size_px();
    let raw_x_min = (bounds.min_x / cell).floor() as i32;
    let raw_x_max = (bounds.max_x / cell).ceil() as i32 - 1;
    let raw_y_min = (bounds.min_y / cell).floor() as i32;
    let raw_y_max = (bounds.max_y / cell).ceil() as i32 - 1;

    let limit = grid.size() as i32 - 1;
    let x_min = raw_x_min.max(0);
    let x_max = raw_x_max.min(limit);
    let y_min = raw_y_min.max(0);
    let y_max = raw_y_max.min(limit);

    if x_min > x_max || y_min > y_max {
        return None;
    }

    Some(TileRectInclusive {
        x_min: x_min as u32,
        x_max: x_max as u32,
        y_min: y_min as u32,
        y_max: y_max as u32,
    })
}

fn draw_shape(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    shape: ShapeKind,
    half_size: i32,
    color: [u8; 4],
) {
    match shape {
        ShapeKind::Square => draw_square(frame, width, height, cx, cy, half_size, color),
        ShapeKind::Circle => draw_circle(frame, width, height, cx, cy, half_size, color),
        ShapeKind::Diamond => draw_diamond(frame, width, height, cx, cy, half_size, color),
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= width as i32 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn draw_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for y in (cy - half_size)..=(cy + half_size) {
        for x in (cx - half_size)..=(cx + half_size) {
            if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

fn draw_circle(
    frame: &mut [u8],
    width: u32,
    _height: u32,
    cx: i32,
    cy: i32,
    radius: i32,
    color: [u8; 4],
) {
    let radius_sq = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius_sq {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, cx + dx, cy + dy, color);
        }
    }
}

fn draw_diamond(
    frame: &mut [u8],
    width: u32,
    _height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for dy in -half_size..=half_size {
        for dx in -half_size..=half_size {
            if dx.abs() + dy.abs() > half_size {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, cx + dx, cy + dy, color);
        }
    }
}

fn draw_square_outline(
    frame: &mut [u8],
    width: u32,
    _height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    let left = cx - half_size;
    let right = cx + half_size;
    let top = cy - half_size;
    let bottom = cy + half_size;

    for x in left..=right {
        write_pixel_rgba_clipped(frame, width as usize, x, top, color);
        write_pixel_rgba_clipped(frame, width as usize, x, bottom, color);
    }
    for y in top..=bottom {
        write_pixel_rgba_clipped(frame, width as usize, left, y, color);
        write_pixel_rgba_clipped(frame, width as usize, right, y, color);
    }
}

fn draw_cross(
    frame: &mut [u8],
    width: u32,
    _height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for x in (cx - half_size)..=(cx + half_size) {
        write_pixel_rgba_clipped(frame, width as usize, x, cy, color);
    }
    for y in (cy - half_size)..=(cy + half_size) {
        write_pixel_rgba_clipped(frame, width as usize, cx, y, color);
    }
}

fn draw_sprite_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center_x: i32,
    center_y: i32,
    sprite: &LoadedSprite,
) {
    if sprite.width == 0 || sprite.height == 0 || width == 0 || height == 0 {
        return;
    }
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.rgba.len() < expected_rgba_len {
        return;
    }

    let left = center_x - (sprite.width as i32 / 2);
    let top = center_y - (sprite.height as i32 / 2);
    let right = left + sprite.width as i32;
    let bottom = top + sprite.height as i32;

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = right.min(width as i32);
    let draw_bottom = bottom.min(height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let frame_width = width as usize;
    let sprite_width = sprite.width as usize;

    for out_y in draw_top..draw_bottom {
        let src_y = (out_y - top) as usize;
        let src_row_offset = src_y * sprite_width * 4;
        let dst_row_offset = out_y as usize * frame_width * 4;

        for out_x in draw_left..draw_right {
            let src_x = (out_x - left) as usize;
            let src_offset = src_row_offset + src_x * 4;
            let alpha = sprite.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = dst_row_offset + out_x as usize * 4;
            frame[dst_offset..dst_offset + 4].copy_from_slice(&sprite.rgba[src_offset..src_offset + 4]);
        }
    }
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_root: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let sprite = match resolve_sprite_image_path(asset_root, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(
                        warned_missing_sprite_keys,
                        key,
                        Some(path.as_path()),
                        reason.as_str(),
                    );
                    None
                }
            },
            Err(reason) => {
                warn_sprite_load_once(warned_missing_sprite_keys, key, None, reason.as_str());
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn resolve_sprite_image_path(asset_root: &Path, key: &str) -> Result<PathBuf, String> {
    validate_sprite_key(key).map_err(|error| format!("invalid_key:{error}"))?;
    Ok(asset_root.join("sprites").join(format!("{key}.png")))
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{GridPos, Kinematics, RenderableDesc, Transform};

    fn open_grid(size: u32, cell_size_px: f32) -> TerrainGrid {
        TerrainGrid::new(
            size,
            cell_size_px,
            vec![TerrainKind::Land; size as usize * size as usize],
        )
        .expect("grid")
    }

    fn shape_desc(debug_name: &'static str) -> RenderableDesc {
        RenderableDesc {
            kind: RenderableKind::Shape {
                shape: ShapeKind::Square,
                color: [1, 2, 3, 255],
            },
            debug_name,
        }
    }

    fn pixel_at(frame: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * width + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn visible_tile_rect_clamps_to_grid_bounds() {
        let grid = open_grid(8, 16.0);
        let bounds = WorldBounds {
            min_x: -100.0,
            max_x: 1000.0,
            min_y: -100.0,
            max_y: 1000.0,
        };
        assert_eq!(
            visible_tile_rect(&grid, &bounds),
            Some(TileRectInclusive {
                x_min: 0,
                x_max: 7,
                y_min: 0,
                y_max: 7,
            })
        );
    }

    #[test]
    fn visible_tile_rect_is_none_when_view_misses_grid() {
        let grid = open_grid(8, 16.0);
        let bounds = WorldBounds {
            min_x: 1000.0,
            max_x: 2000.0,
            min_y: 0.0,
            max_y: 100.0,
        };
        assert_eq!(visible_tile_rect(&grid, &bounds), None);
    }

    #[test]
    fn visible_tile_rect_selects_partial_window() {
        let grid = open_grid(8, 16.0);
        let bounds = WorldBounds {
            min_x: 17.0,
            max_x: 40.0,
            min_y: 0.0,
            max_y: 15.0,
        };
        assert_eq!(
            visible_tile_rect(&grid, &bounds),
            Some(TileRectInclusive {
                x_min: 1,
                x_max: 2,
                y_min: 0,
                y_max: 0,
            })
        );
    }

    #[test]
    fn draw_primitives_clip_instead_of_panicking() {
        let width = 8u32;
        let height = 8u32;
        let mut frame = vec![0u8; (width * height * 4) as usize];

        draw_square(&mut frame, width, height, -10, -10, 3, [255; 4]);
        draw_circle(&mut frame, width, height, 20, 20, 5, [255; 4]);
        draw_diamond(&mut frame, width, height, 7, 7, 4, [255; 4]);
        draw_square_outline(&mut frame, width, height, 0, 0, 6, [255; 4]);
        draw_cross(&mut frame, width, height, 4, 4, 12, [255; 4]);
    }

    #[test]
    fn draw_circle_fills_center_and_respects_radius() {
        let width = 16u32;
        let height = 16u32;
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let color = [9, 9, 9, 255];

        draw_circle(&mut frame, width, height, 8, 8, 3, color);

        assert_eq!(pixel_at(&frame, width as usize, 8, 8), color);
        assert_eq!(pixel_at(&frame, width as usize, 11, 8), color);
        assert_eq!(pixel_at(&frame, width as usize, 11, 11), [0, 0, 0, 0]);
    }

    #[test]
    fn draw_diamond_excludes_square_corners() {
        let width = 16u32;
        let height = 16u32;
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let color = [7, 7, 7, 255];

        draw_diamond(&mut frame, width, height, 8, 8, 4, color);

        assert_eq!(pixel_at(&frame, width as usize, 8, 4), color);
        assert_eq!(pixel_at(&frame, width as usize, 12, 8), color);
        assert_eq!(pixel_at(&frame, width as usize, 12, 12), [0, 0, 0, 0]);
    }

    #[test]
    fn movers_draw_after_items() {
        let mut world = SceneWorld::default();
        let item = world.spawn(Transform::default(), shape_desc("item"));
        let player = world.spawn_mover(Transform::default(), shape_desc("player"));
        world.apply_pending();
        world.find_entity_mut(item).expect("item").collectible = Some(crate::app::Collectible {
            kind: crate::app::ItemKind::Coin,
            cell: GridPos { x: 0, y: 0 },
            collected: false,
        });

        let mut order = Vec::new();
        collect_draw_order_movers_last(world.entities(), &mut order);
        let ids: Vec<_> = order
            .into_iter()
            .map(|index| world.entities()[index].id)
            .collect();
        assert_eq!(ids, vec![item, player]);

        let mover = world.find_entity_mut(player).expect("player");
        assert!(mover.kinematics.is_some());
        assert_eq!(mover.kinematics, Some(Kinematics::default()));
    }

    #[test]
    fn sprite_path_rejects_invalid_keys() {
        let root = Path::new("/tmp/assets");
        assert!(resolve_sprite_image_path(root, "player").is_ok());
        assert!(resolve_sprite_image_path(root, "../escape").is_err());
        assert!(resolve_sprite_image_path(root, "UPPER").is_err());
    }

    #[test]
    fn shape_half_size_scales_with_cell_size_and_never_hits_zero() {
        assert_eq!(entity_shape_half_size_px(32.0), 11);
        assert_eq!(entity_shape_half_size_px(1.0), 1);
    }
}
