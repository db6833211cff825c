struct IslandScene {
    config: GameConfig,
    player_id: Option<EntityId>,
    controller: DragDirectionController,
    ledger: InventoryLedger,
    events: GameplayEventBus,
    tick_counter: u64,
    items_placed: usize,
    regeneration_count: u64,
}

#[derive(Debug, Default)]
struct TickSideEffects {
    blocked_marker_positions: Vec<Vec2>,
    collected_items: Vec<CollectedItem>,
    player_position: Option<Vec2>,
}

impl IslandScene {
    fn new(config: GameConfig) -> Self {
        let max_distinct_kinds = config.inventory.max_distinct_kinds;
        Self {
            config,
            player_id: None,
            controller: DragDirectionController::default(),
            ledger: InventoryLedger::with_capacity(max_distinct_kinds),
            events: GameplayEventBus::default(),
            tick_counter: 0,
            items_placed: 0,
            regeneration_count: 0,
        }
    }

    /// A pinned seed reproduces the same island; successive regenerations
    /// walk forward from it so `R` still yields a fresh layout per press.
    fn session_seed(&self) -> u64 {
        match self.config.terrain.seed {
            Some(seed) => seed.wrapping_add(self.regeneration_count),
            None => rand::random(),
        }
    }

    /// Closest land cell to the island center, scan order as tie-break. The
    /// generator guarantees land; an all-water grid would still resolve to
    /// the center cell instead of panicking.
    fn spawn_cell(grid: &TerrainGrid) -> GridPos {
        let size = grid.size() as i32;
        let center = (size as f32 - 1.0) / 2.0;
        let mut best: Option<(f32, GridPos)> = None;
        for y in 0..size {
            for x in 0..size {
                if !grid.is_walkable(x, y) {
                    continue;
                }
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let distance_sq = dx * dx + dy * dy;
                match best {
                    Some((current, _)) if current <= distance_sq => {}
                    _ => {
                        best = Some((
                            distance_sq,
                            GridPos {
                                x: x as u32,
                                y: y as u32,
                            },
                        ))
                    }
                }
            }
        }
        best.map(|(_, cell)| cell)
            .unwrap_or_else(|| grid.clamp_cell(size / 2, size / 2))
    }

    /// Controller, mover, snap, and collection in that order; collection
    /// reads the grid coordinate the snap just made authoritative.
    fn run_world_systems(
        &mut self,
        fixed_dt_seconds: f32,
        world: &mut SceneWorld,
    ) -> TickSideEffects {
        let mut effects = TickSideEffects::default();
        let speed = self.config.world.move_speed_px_per_second;
        let (terrain, entities) = world.terrain_and_entities_mut();
        let Some(grid) = terrain else {
            return effects;
        };
        let Some(player_id) = self.player_id else {
            return effects;
        };
        let Some(player_index) = entities.iter().position(|entity| entity.id == player_id) else {
            return effects;
        };

        let player_cell;
        {
            let player = &mut entities[player_index];
            let mut position = player.transform.position;
            let mut grid_pos = player
                .grid_pos
                .unwrap_or_else(|| grid.cell_containing(position));
            let mut kinematics = player.kinematics.unwrap_or_default();

            let outcome =
                self.controller
                    .reconcile(grid, position, &mut grid_pos, &mut kinematics, speed);
            if let ReconcileOutcome::Blocked { at, direction } = outcome {
                let (dx, dy) = direction.step();
                let blocked_cell = grid.clamp_cell(at.x as i32 + dx, at.y as i32 + dy);
                effects
                    .blocked_marker_positions
                    .push(grid.cell_center(blocked_cell));
                self.events.emit(GameplayEvent::MoveBlocked {
                    from: at,
                    direction,
                });
            }

            position = kinematics.advance(position, fixed_dt_seconds);
            resolve_grid_snap(grid, &mut position, &mut grid_pos, &mut kinematics);

            player.transform.position = position;
            player.grid_pos = Some(grid_pos);
            player.kinematics = Some(kinematics);
            effects.player_position = Some(position);
            player_cell = grid_pos;
        }

        effects.collected_items = resolve_collection(
            entities,
            player_cell,
            &mut self.ledger,
            self.tick_counter,
            &mut self.events,
        );
        effects
    }
}

impl Scene for IslandScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let seed = self.session_seed();
        let (grid, report) = generate_island(
            &self.config.terrain,
            self.config.world.grid_size,
            self.config.world.cell_size_px,
            seed,
        );
        info!(
            seed = report.seed,
            attempts = report.attempts,
            used_fallback = report.used_fallback,
            land_cells = report.land_cells,
            "terrain_generated"
        );

        let spawn_cell = Self::spawn_cell(&grid);
        let spawn_position = grid.cell_center(spawn_cell);
        let forbidden_zones = [ForbiddenZone {
            center: spawn_cell,
            radius_cells: self.config.items.spawn_clear_radius_cells.max(0.0),
        }];
        let mut placement_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let plans = resolve_spawn_plans(&self.config.items.kinds);
        let placements = place_items(&plans, &grid, &forbidden_zones, &mut placement_rng);
        let item_spawns: Vec<(ItemKind, GridPos, Vec2)> = placements
            .iter()
            .map(|(kind, cell)| (*kind, *cell, grid.cell_center(*cell)))
            .collect();

        world.set_terrain(grid);
        let player_id = world.spawn_mover(
            Transform {
                position: spawn_position,
            },
            player_renderable(),
        );
        let mut spawned_items = Vec::with_capacity(item_spawns.len());
        for (kind, cell, position) in item_spawns {
            let id = world.spawn(Transform { position }, item_renderable(kind));
            spawned_items.push((id, kind, cell));
        }
        world.apply_pending();
        for (id, kind, cell) in spawned_items {
            if let Some(entity) = world.find_entity_mut(id) {
                entity.collectible = Some(Collectible {
                    kind,
                    cell,
                    collected: false,
                });
            }
        }
        world.camera_mut().position = spawn_position;

        self.player_id = Some(player_id);
        self.controller.clear();
        self.ledger = InventoryLedger::with_capacity(self.config.inventory.max_distinct_kinds);
        self.events = GameplayEventBus::default();
        self.tick_counter = 0;
        self.items_placed = placements.len();
        info!(
            entity_count = world.entity_count(),
            items_placed = placements.len(),
            spawn_x = spawn_cell.x,
            spawn_y = spawn_cell.y,
            "island_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.is_down(InputAction::Regenerate) {
            self.regeneration_count = self.regeneration_count.wrapping_add(1);
            info!(
                regeneration = self.regeneration_count,
                "island_regeneration_requested"
            );
            return SceneCommand::Reset;
        }

        self.tick_counter = self.tick_counter.saturating_add(1);
        self.controller.ingest_pointer_events(input.pointer_events());

        let effects = self.run_world_systems(fixed_dt_seconds, world);

        for position in &effects.blocked_marker_positions {
            world.push_feedback_marker(FeedbackMarker {
                kind: FeedbackMarkerKind::Blocked,
                position_world: *position,
                ttl_seconds: BLOCKED_MARKER_TTL_SECONDS,
            });
        }
        for item in &effects.collected_items {
            world.despawn(item.entity_id);
            world.push_feedback_marker(FeedbackMarker {
                kind: FeedbackMarkerKind::Pickup,
                position_world: item.position_world,
                ttl_seconds: PICKUP_MARKER_TTL_SECONDS,
            });
            info!(
                kind = item.kind.as_token(),
                total = self.ledger.total_count(),
                "item_collected"
            );
        }
        if let Some(position) = effects.player_position {
            world.camera_mut().position = position;
        }
        world.tick_feedback_markers(fixed_dt_seconds);

        for event in self.events.events_this_tick() {
            if let GameplayEvent::MoveBlocked { from, direction } = event {
                debug!(
                    cell_x = from.x,
                    cell_y = from.y,
                    direction = direction.as_token(),
                    "move_blocked"
                );
            }
        }
        self.events.finish_tick_rollover();
        let counts = self.events.last_tick_counts();
        if counts.total > 0 {
            debug!(
                move_blocked = counts.move_blocked,
                item_collected = counts.item_collected,
                collection_rejected = counts.collection_rejected,
                "tick_events"
            );
        }

        SceneCommand::None
    }

    fn render(&mut self, _world: &SceneWorld) {}

    fn unload(&mut self, world: &mut SceneWorld) {
        info!(entity_count = world.entity_count(), "island_unloaded");
        self.player_id = None;
        self.controller.clear();
        self.events = GameplayEventBus::default();
        self.tick_counter = 0;
        self.items_placed = 0;
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        let player = self.player_id.and_then(|id| world.find_entity(id))?;
        let cell = player.grid_pos?;
        Some(format!(
            "Skerry | Cell ({}, {}) | Collected {}/{} | Entities {}",
            cell.x,
            cell.y,
            self.ledger.total_count(),
            self.items_placed,
            world.entity_count()
        ))
    }
}
