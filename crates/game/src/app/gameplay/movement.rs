#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileOutcome {
    /// Mid-flight, or gliding through the origin center with a live target.
    InFlight,
    /// At rest at a cell center with no direction intent.
    Idle,
    /// Direction ran into the grid boundary; intent cleared.
    Stopped,
    /// Terrain refused the transition; intent cleared, feedback owed.
    Blocked { at: GridPos, direction: CardinalDir },
    /// A move to an adjacent cell was committed or refreshed.
    MoveIssued { to: GridPos },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapOutcome {
    NotMoving,
    InFlight,
    Snapped { cell: GridPos },
    AbortedIllegalCell { cell: GridPos },
}

/// Converts a continuous pointer drag into committed cardinal moves.
///
/// Intent (the drag's candidate direction) is sampled continuously for
/// responsiveness; commitment to an adjacent cell happens only at cell
/// centers, where terrain legality can be judged. Conflating the two either
/// lags the controls or lets the entity drift off-grid.
#[derive(Debug, Default)]
struct DragDirectionController {
    drag_origin: Option<Vec2>,
    candidate: Option<CardinalDir>,
    committed: Option<CardinalDir>,
}

impl DragDirectionController {
    fn clear(&mut self) {
        *self = Self::default();
    }

    /// A new press silently supersedes any stale drag. Release drops the
    /// candidate but never force-stops an in-flight move; the entity glides
    /// to the cell it already committed to instead of halting mid-cell.
    fn ingest_pointer_events(&mut self, events: &[PointerEvent]) {
        for event in events {
            match *event {
                PointerEvent::Down { position } => {
                    self.drag_origin = Some(position);
                    self.candidate = None;
                }
                PointerEvent::Move { position, .. } => {
                    let Some(origin) = self.drag_origin else {
                        continue;
                    };
                    if origin.distance_to(position) > DRAG_THRESHOLD_PX {
                        let drag = Vec2 {
                            x: position.x - origin.x,
                            y: position.y - origin.y,
                        };
                        self.candidate = Some(quantize_drag_direction(drag));
                    }
                }
                PointerEvent::Up { .. } => {
                    self.drag_origin = None;
                    self.candidate = None;
                }
            }
        }
    }

    #[cfg(test)]
    fn candidate(&self) -> Option<CardinalDir> {
        self.candidate
    }

    /// Runs once per tick, and acts only when the entity sits within
    /// `ARRIVAL_EPSILON_PX` of a cell center. The grid coordinate is never
    /// re-derived mid-flight; a re-derivation racing an in-progress move is
    /// exactly the incoherence this gate exists to prevent.
    fn reconcile(
        &mut self,
        grid: &TerrainGrid,
        position: Vec2,
        grid_pos: &mut GridPos,
        kinematics: &mut Kinematics,
        speed_px_per_second: f32,
    ) -> ReconcileOutcome {
        let at_cell = grid.cell_containing(position);
        if position.distance_to(grid.cell_center(at_cell)) >= ARRIVAL_EPSILON_PX {
            return ReconcileOutcome::InFlight;
        }

        let Some(direction) = self.candidate else {
            if kinematics.moving() {
                return ReconcileOutcome::InFlight;
            }
            *grid_pos = at_cell;
            kinematics.stop();
            self.committed = None;
            return ReconcileOutcome::Idle;
        };

        *grid_pos = at_cell;
        let (dx, dy) = direction.step();
        let target_x = at_cell.x as i32 + dx;
        let target_y = at_cell.y as i32 + dy;

        if grid.clamp_cell(target_x, target_y) == at_cell {
            kinematics.stop();
            self.candidate = None;
            self.committed = None;
            return ReconcileOutcome::Stopped;
        }

        if !grid.can_move(at_cell, target_x, target_y) {
            kinematics.stop();
            self.candidate = None;
            self.committed = None;
            return ReconcileOutcome::Blocked {
                at: at_cell,
                direction,
            };
        }

        let target_cell = GridPos {
            x: target_x as u32,
            y: target_y as u32,
        };
        if self.committed != Some(direction) {
            kinematics.velocity = Vec2 {
                x: dx as f32 * speed_px_per_second,
                y: dy as f32 * speed_px_per_second,
            };
            self.committed = Some(direction);
        }
        // Same direction keeps its velocity and only refreshes the target:
        // continuous gliding without restart jitter.
        kinematics.target = Some(grid.cell_center(target_cell));
        ReconcileOutcome::MoveIssued { to: target_cell }
    }
}

/// Arrival re-quantization. The cell is derived from the target, not by
/// re-rounding the position: a position a hair short of a cell boundary can
/// round into the wrong cell. The walkability re-check is unreachable when
/// the controller pre-checked the move, but an ordering bug must end as a
/// cleared target, never as a teleport onto water.
fn resolve_grid_snap(
    grid: &TerrainGrid,
    position: &mut Vec2,
    grid_pos: &mut GridPos,
    kinematics: &mut Kinematics,
) -> SnapOutcome {
    let Some(target) = kinematics.target else {
        return SnapOutcome::NotMoving;
    };
    if position.distance_to(target) >= ARRIVAL_EPSILON_PX {
        return SnapOutcome::InFlight;
    }

    let cell = grid.cell_containing(target);
    if !grid.is_walkable(cell.x as i32, cell.y as i32) {
        kinematics.stop();
        warn!(
            cell_x = cell.x,
            cell_y = cell.y,
            "snap_aborted_non_walkable_cell"
        );
        return SnapOutcome::AbortedIllegalCell { cell };
    }

    *position = target;
    *grid_pos = cell;
    kinematics.stop();
    SnapOutcome::Snapped { cell }
}
