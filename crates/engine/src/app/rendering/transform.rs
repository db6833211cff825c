use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// World and screen space share the same pixel scale and +y-down
/// orientation; the camera position is the world point at the window center.
pub fn world_to_screen_px(camera: &Camera2D, window_size: (u32, u32), world: Vec2) -> (i32, i32) {
    let x = world.x - camera.position.x + window_size.0 as f32 * 0.5;
    let y = world.y - camera.position.y + window_size.1 as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(camera: &Camera2D, window_size: (u32, u32), screen: Vec2) -> Vec2 {
    Vec2 {
        x: screen.x - window_size.0 as f32 * 0.5 + camera.position.x,
        y: screen.y - window_size.1 as f32 * 0.5 + camera.position.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_position_maps_to_window_center() {
        let camera = Camera2D {
            position: Vec2 { x: 100.0, y: 50.0 },
        };
        let (x, y) = world_to_screen_px(&camera, (800, 600), Vec2 { x: 100.0, y: 50.0 });
        assert_eq!((x, y), (400, 300));
    }

    #[test]
    fn positive_world_y_moves_down_the_screen() {
        let camera = Camera2D::default();
        let (_, above) = world_to_screen_px(&camera, (800, 600), Vec2 { x: 0.0, y: -32.0 });
        let (_, below) = world_to_screen_px(&camera, (800, 600), Vec2 { x: 0.0, y: 32.0 });
        assert!(below > above);
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let camera = Camera2D {
            position: Vec2 { x: 64.0, y: -16.0 },
        };
        let world = Vec2 { x: 131.0, y: 7.0 };
        let (sx, sy) = world_to_screen_px(&camera, (1280, 720), world);
        let round_trip = screen_to_world_px(
            &camera,
            (1280, 720),
            Vec2 {
                x: sx as f32,
                y: sy as f32,
            },
        );
        assert!((round_trip.x - world.x).abs() < 0.5);
        assert!((round_trip.y - world.y).abs() < 0.5);
    }
}
