use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{resolve_app_paths, StartupError};

use super::input::{ActionStates, InputAction, PointerEvent, PointerEventQueue};
use super::metrics::MetricsAccumulator;
use super::scene::SceneHost;
use super::{InputSnapshot, MetricsHandle, Renderer, Scene, SceneCommand, Vec2};

pub const SLOW_FRAME_ENV_VAR: &str = "SKERRY_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Skerry".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let mut host = SceneHost::new(scene);
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        "startup"
    );

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), app_paths.assets_dir.clone())
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::new(config.window_width, config.window_height);
    host.load();
    host.apply_pending();
    info!(entity_count = host.world().entity_count(), "scene_loaded");

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        input_collector.mark_quit_requested();
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        input_collector.set_window_size(new_size.width, new_size.height);
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window.inner_size();
                        input_collector.set_window_size(size.width, size.height);
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        input_collector.handle_cursor_moved(position.x as f32, position.y as f32);
                    }
                    WindowEvent::CursorLeft { .. } => {
                        input_collector.handle_cursor_left();
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        input_collector.handle_mouse_input(button, state);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if slow_frame_delay > Duration::ZERO {
                            // Explicit debug perturbation only; this is not the FPS cap.
                            thread::sleep(slow_frame_delay);
                        }

                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                        accumulator = accumulator.saturating_add(clamped_frame_dt);

                        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                        for _ in 0..step_plan.ticks_to_run {
                            let input_snapshot = input_collector.snapshot_for_tick();
                            let command = host.update(fixed_dt_seconds, &input_snapshot);
                            host.apply_pending();

                            if command == SceneCommand::Reset {
                                host.reset();
                                host.apply_pending();
                                info!(
                                    entity_count = host.world().entity_count(),
                                    "scene_reset"
                                );
                            }
                            metrics_accumulator.record_tick();
                        }
                        accumulator = step_plan.remaining_accumulator;

                        if step_plan.dropped_backlog > Duration::ZERO {
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame, "sim_clamp_triggered"
                            );
                        }

                        // Single authoritative FPS cap sleep point for render pacing.
                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep =
                            compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        host.render();
                        if let Err(error) = renderer.render_world(host.world()) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                        last_present_instant = Instant::now();

                        let next_title = host.debug_title();
                        if next_title != last_applied_title {
                            if let Some(title) = &next_title {
                                window.set_title(title);
                            } else {
                                window.set_title(&config.window_title);
                            }
                            last_applied_title = next_title;
                        }
                        metrics_accumulator.record_frame(raw_frame_dt);

                        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                avg_frame_ms = snapshot.avg_frame_ms,
                                worst_frame_ms = snapshot.worst_frame_ms,
                                entity_count = host.world().entity_count(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                host.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Buffers host callbacks between ticks. Pointer transitions land in a
/// bounded queue and reach the simulation only through `snapshot_for_tick`,
/// which drains the queue exactly once; nothing is processed mid-frame.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    regenerate_key_is_down: bool,
    regenerate_pressed_edge: bool,
    action_states: ActionStates,
    cursor_position_px: Option<Vec2>,
    pointer_is_down: bool,
    pointer_queue: PointerEventQueue,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            PhysicalKey::Code(KeyCode::KeyR) => {
                if is_pressed && !self.regenerate_key_is_down {
                    self.regenerate_pressed_edge = true;
                }
                self.regenerate_key_is_down = is_pressed;
            }
            _ => {}
        }
    }

    fn handle_cursor_moved(&mut self, x: f32, y: f32) {
        let position = Vec2 { x, y };
        let delta = match self.cursor_position_px {
            Some(previous) => Vec2 {
                x: position.x - previous.x,
                y: position.y - previous.y,
            },
            None => Vec2::default(),
        };
        self.cursor_position_px = Some(position);
        if self.pointer_is_down {
            self.pointer_queue
                .push(PointerEvent::Move { position, delta });
        }
    }

    fn handle_cursor_left(&mut self) {
        // Leaving the window ends any drag in flight; a release outside the
        // window would otherwise never be observed.
        if self.pointer_is_down {
            let position = self.cursor_position_px.unwrap_or_default();
            self.pointer_queue.push(PointerEvent::Up { position });
            self.pointer_is_down = false;
        }
        self.cursor_position_px = None;
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        let position = self.cursor_position_px.unwrap_or_default();
        match state {
            ElementState::Pressed => {
                if !self.pointer_is_down {
                    self.pointer_queue.push(PointerEvent::Down { position });
                }
                self.pointer_is_down = true;
            }
            ElementState::Released => {
                if self.pointer_is_down {
                    self.pointer_queue.push(PointerEvent::Up { position });
                }
                self.pointer_is_down = false;
            }
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let mut actions = self.action_states;
        actions.set(InputAction::Regenerate, self.regenerate_pressed_edge);
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            actions,
            self.cursor_position_px,
            self.pointer_queue.drain(),
            self.window_width,
            self.window_height,
        );
        self.regenerate_pressed_edge = false;
        snapshot
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_runs_whole_ticks_and_keeps_remainder() {
        let plan = plan_sim_steps(Duration::from_millis(50), Duration::from_millis(16), 5);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_drops_backlog_beyond_tick_clamp() {
        let plan = plan_sim_steps(Duration::from_millis(200), Duration::from_millis(16), 5);
        assert_eq!(plan.ticks_to_run, 5);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, Duration::from_millis(120));
    }

    #[test]
    fn frame_delta_clamps_to_configured_maximum() {
        assert_eq!(
            clamp_frame_delta(Duration::from_secs(10), Duration::from_millis(250)),
            Duration::from_millis(250)
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(16), Duration::from_millis(250)),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn cap_sleep_is_zero_when_uncapped_or_already_late() {
        assert_eq!(compute_cap_sleep(Duration::from_millis(5), None), Duration::ZERO);
        assert_eq!(
            compute_cap_sleep(
                Duration::from_millis(40),
                Some(Duration::from_millis(33))
            ),
            Duration::ZERO
        );
        assert_eq!(
            compute_cap_sleep(
                Duration::from_millis(13),
                Some(Duration::from_millis(33))
            ),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn render_cap_normalization_rejects_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(30)), Some(30));
        assert_eq!(normalize_render_fps_cap(None), None);
    }

    #[test]
    fn drag_sequence_reaches_snapshot_in_order() {
        let mut collector = InputCollector::new(640, 480);
        collector.handle_cursor_moved(100.0, 100.0);
        collector.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        collector.handle_cursor_moved(110.0, 100.0);
        collector.handle_cursor_moved(125.0, 100.0);
        collector.handle_mouse_input(MouseButton::Left, ElementState::Released);

        let snapshot = collector.snapshot_for_tick();
        let events = snapshot.pointer_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], PointerEvent::Down { .. }));
        assert!(matches!(
            events[1],
            PointerEvent::Move { delta, .. } if (delta.x - 10.0).abs() < 0.001
        ));
        assert!(matches!(
            events[2],
            PointerEvent::Move { delta, .. } if (delta.x - 15.0).abs() < 0.001
        ));
        assert!(matches!(events[3], PointerEvent::Up { .. }));

        assert!(collector.snapshot_for_tick().pointer_events().is_empty());
    }

    #[test]
    fn moves_without_a_press_are_not_buffered() {
        let mut collector = InputCollector::new(640, 480);
        collector.handle_cursor_moved(10.0, 10.0);
        collector.handle_cursor_moved(20.0, 20.0);

        let snapshot = collector.snapshot_for_tick();
        assert!(snapshot.pointer_events().is_empty());
        assert_eq!(
            snapshot.cursor_position_px(),
            Some(Vec2 { x: 20.0, y: 20.0 })
        );
    }

    #[test]
    fn cursor_leaving_window_ends_the_drag() {
        let mut collector = InputCollector::new(640, 480);
        collector.handle_cursor_moved(50.0, 50.0);
        collector.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        collector.handle_cursor_left();

        let snapshot = collector.snapshot_for_tick();
        let events = snapshot.pointer_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], PointerEvent::Up { .. }));
        assert_eq!(snapshot.cursor_position_px(), None);
    }

    #[test]
    fn non_left_buttons_are_ignored() {
        let mut collector = InputCollector::new(640, 480);
        collector.handle_cursor_moved(50.0, 50.0);
        collector.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        collector.handle_mouse_input(MouseButton::Middle, ElementState::Pressed);

        assert!(collector.snapshot_for_tick().pointer_events().is_empty());
    }

    #[test]
    fn duplicate_press_events_buffer_a_single_down() {
        let mut collector = InputCollector::new(640, 480);
        collector.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        collector.handle_mouse_input(MouseButton::Left, ElementState::Pressed);

        let snapshot = collector.snapshot_for_tick();
        assert_eq!(snapshot.pointer_events().len(), 1);
    }
}
