/// Circular exclusion region in cell coordinates; keeps spawn-adjacent
/// cells item-free.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ForbiddenZone {
    center: GridPos,
    radius_cells: f32,
}

impl ForbiddenZone {
    fn contains(&self, cell: GridPos) -> bool {
        let dx = cell.x as f32 - self.center.x as f32;
        let dy = cell.y as f32 - self.center.y as f32;
        dx * dx + dy * dy <= self.radius_cells * self.radius_cells
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ItemSpawnPlan {
    kind: ItemKind,
    target_count: u32,
    accept_probability: f32,
}

/// Config names resolve through the closed kind table; unknown names are
/// logged and skipped rather than failing the session.
fn resolve_spawn_plans(kinds: &[ItemSpawnConfig]) -> Vec<ItemSpawnPlan> {
    kinds
        .iter()
        .filter_map(|entry| match item_kind_by_name(&entry.kind) {
            Some(kind) => Some(ItemSpawnPlan {
                kind,
                target_count: entry.target_count,
                accept_probability: entry.accept_probability.clamp(0.0, 1.0),
            }),
            None => {
                warn!(kind = entry.kind.as_str(), "unknown_item_kind_skipped");
                None
            }
        })
        .collect()
}

/// Scatter items up to each kind's target count. Every attempt draws a
/// uniform in-bounds cell and rejects it if occupied, forbidden, or not
/// walkable; survivors pass a per-kind acceptance gate that controls
/// density. Attempts are bounded at 10x the target; a shortfall is a log
/// line, an infinite loop would be a bug.
fn place_items(
    plans: &[ItemSpawnPlan],
    grid: &TerrainGrid,
    forbidden_zones: &[ForbiddenZone],
    rng: &mut StdRng,
) -> Vec<(ItemKind, GridPos)> {
    let mut placements = Vec::new();
    if grid.size() == 0 {
        return placements;
    }

    let mut occupied: HashSet<GridPos> = HashSet::new();
    for plan in plans {
        let mut placed = 0u32;
        let attempt_budget = plan
            .target_count
            .saturating_mul(PLACEMENT_ATTEMPTS_PER_REQUESTED_ITEM);
        for _ in 0..attempt_budget {
            if placed >= plan.target_count {
                break;
            }
            let cell = GridPos {
                x: rng.gen_range(0..grid.size()),
                y: rng.gen_range(0..grid.size()),
            };
            if occupied.contains(&cell) {
                continue;
            }
            if forbidden_zones.iter().any(|zone| zone.contains(cell)) {
                continue;
            }
            if !grid.is_walkable(cell.x as i32, cell.y as i32) {
                continue;
            }
            if rng.gen::<f32>() >= plan.accept_probability {
                continue;
            }
            occupied.insert(cell);
            placements.push((plan.kind, cell));
            placed += 1;
        }
        if placed < plan.target_count {
            warn!(
                kind = plan.kind.as_token(),
                placed,
                requested = plan.target_count,
                "placement_shortfall"
            );
        }
    }
    placements
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CollectedItem {
    entity_id: EntityId,
    kind: ItemKind,
    position_world: Vec2,
}

/// Cell-exact collection against the authoritative post-snap coordinate.
/// Collecting is idempotent (a collected item never matches again) and
/// transactional: a ledger refusal rolls the item back to collectible so a
/// later tick can retry.
fn resolve_collection(
    entities: &mut [Entity],
    player_cell: GridPos,
    ledger: &mut InventoryLedger,
    tick: u64,
    events: &mut GameplayEventBus,
) -> Vec<CollectedItem> {
    let mut collected = Vec::new();
    for entity in entities.iter_mut() {
        let Some(collectible) = entity.collectible.as_mut() else {
            continue;
        };
        if collectible.collected || collectible.cell != player_cell {
            continue;
        }

        collectible.collected = true;
        if ledger.add(collectible.kind, tick) {
            events.emit(GameplayEvent::ItemCollected {
                kind: collectible.kind,
                cell: player_cell,
            });
            collected.push(CollectedItem {
                entity_id: entity.id,
                kind: collectible.kind,
                position_world: entity.transform.position,
            });
        } else {
            collectible.collected = false;
            events.emit(GameplayEvent::CollectionRejected {
                kind: collectible.kind,
                cell: player_cell,
            });
        }
    }
    collected
}
