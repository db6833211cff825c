#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GenerationReport {
    seed: u64,
    attempts: u32,
    used_fallback: bool,
    land_cells: usize,
}

/// Produce a fully connected island. Each attempt runs weighted radial
/// growth then edge erosion and is accepted only if every land cell is
/// reachable from every other; after `max_retries` rejections a filled disk
/// takes over, so this never fails and never loops unbounded.
fn generate_island(
    config: &TerrainConfig,
    grid_size: u32,
    cell_size_px: f32,
    seed: u64,
) -> (TerrainGrid, GenerationReport) {
    let size = grid_size.max(4);
    let cell_size = sanitized_cell_size(cell_size_px);
    let land_ratio = config.land_ratio.clamp(0.0, 1.0);
    let center_radius = config.center_radius.max(0.0);
    let mut rng = StdRng::seed_from_u64(seed);

    for attempt in 1..=config.max_retries {
        let cells = grow_island_attempt(
            size,
            land_ratio,
            center_radius,
            config.edge_water_range,
            &mut rng,
        );
        if land_is_connected(&cells, size) {
            let land_cells = count_land(&cells);
            let grid = build_grid(size, cell_size, cells);
            return (
                grid,
                GenerationReport {
                    seed,
                    attempts: attempt,
                    used_fallback: false,
                    land_cells,
                },
            );
        }
    }

    let cells = fallback_disk_cells(size);
    let land_cells = count_land(&cells);
    let grid = build_grid(size, cell_size, cells);
    (
        grid,
        GenerationReport {
            seed,
            attempts: config.max_retries,
            used_fallback: true,
            land_cells,
        },
    )
}

fn sanitized_cell_size(cell_size_px: f32) -> f32 {
    if cell_size_px.is_finite() && cell_size_px > 0.0 {
        cell_size_px
    } else {
        warn!(cell_size_px = %cell_size_px, "invalid_cell_size_using_default");
        DEFAULT_CELL_SIZE_PX
    }
}

fn build_grid(size: u32, cell_size_px: f32, cells: Vec<TerrainKind>) -> TerrainGrid {
    TerrainGrid::new(size, cell_size_px, cells).expect("generated cell count matches grid size")
}

fn grow_island_attempt(
    size: u32,
    land_ratio: f32,
    center_radius: f32,
    edge_water_range: u32,
    rng: &mut StdRng,
) -> Vec<TerrainKind> {
    let cell_count = size as usize * size as usize;
    let mut cells = vec![TerrainKind::Water; cell_count];
    let max_radius = size as f32 * center_radius;
    let target_land = (land_ratio * cell_count as f32).round() as usize;

    if max_radius > 0.0 && target_land > 0 {
        let center = (size as f32 - 1.0) / 2.0;
        let mut weighted: Vec<(usize, f32)> = (0..cell_count)
            .map(|index| {
                let x = (index % size as usize) as f32;
                let y = (index / size as usize) as f32;
                let distance = ((x - center).powi(2) + (y - center).powi(2)).sqrt();
                (index, (max_radius - distance).max(0.0))
            })
            .collect();
        // Descending weight; index as tie-break keeps the walk deterministic
        // for a given seed.
        weighted.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let mut land_count = 0usize;
        for (index, weight) in weighted {
            if land_count >= target_land {
                break;
            }
            let probability = (weight / max_radius + RADIAL_GROWTH_BASE_PROBABILITY).min(1.0);
            if rng.gen::<f32>() < probability {
                cells[index] = TerrainKind::Land;
                land_count += 1;
            }
        }
    }

    erode_edges(&mut cells, size, edge_water_range, rng);
    cells
}

/// Revert near-border cells to water with probability rising toward the
/// border, leaving a water margin of variable depth around the island.
fn erode_edges(cells: &mut [TerrainKind], size: u32, edge_water_range: u32, rng: &mut StdRng) {
    if edge_water_range == 0 {
        return;
    }
    let range = edge_water_range as f32;
    for index in 0..cells.len() {
        let x = (index % size as usize) as u32;
        let y = (index / size as usize) as u32;
        let distance_to_edge = x.min(y).min(size - 1 - x).min(size - 1 - y) as f32;
        if distance_to_edge >= range {
            continue;
        }
        let probability = (1.0 - distance_to_edge / range) * EDGE_EROSION_STRENGTH;
        if rng.gen::<f32>() < probability {
            cells[index] = TerrainKind::Water;
        }
    }
}

/// Breadth-first flood from an arbitrary land cell over 4-connected land;
/// the grid is accepted only if the flood reaches every land cell. An
/// all-water grid is rejected outright.
fn land_is_connected(cells: &[TerrainKind], size: u32) -> bool {
    let Some(seed_index) = cells.iter().position(|kind| *kind == TerrainKind::Land) else {
        return false;
    };
    let total_land = count_land(cells);

    let width = size as usize;
    let mut visited = vec![false; cells.len()];
    let mut frontier = VecDeque::new();
    visited[seed_index] = true;
    frontier.push_back(seed_index);
    let mut reached = 1usize;

    while let Some(index) = frontier.pop_front() {
        let x = index % width;
        let y = index / width;
        let mut neighbors = [None; 4];
        if x > 0 {
            neighbors[0] = Some(index - 1);
        }
        if x + 1 < width {
            neighbors[1] = Some(index + 1);
        }
        if y > 0 {
            neighbors[2] = Some(index - width);
        }
        if y + 1 < width {
            neighbors[3] = Some(index + width);
        }
        for neighbor in neighbors.into_iter().flatten() {
            if visited[neighbor] || cells[neighbor] != TerrainKind::Land {
                continue;
            }
            visited[neighbor] = true;
            reached += 1;
            frontier.push_back(neighbor);
        }
    }

    reached == total_land
}

fn count_land(cells: &[TerrainKind]) -> usize {
    cells
        .iter()
        .filter(|kind| **kind == TerrainKind::Land)
        .count()
}

/// Deterministic filled disk centered on the grid. Trivially connected, so
/// the generator can always terminate with a playable island.
fn fallback_disk_cells(size: u32) -> Vec<TerrainKind> {
    let cell_count = size as usize * size as usize;
    let center = (size as f32 - 1.0) / 2.0;
    let radius = size as f32 * FALLBACK_DISK_RADIUS_RATIO;
    let radius_sq = radius * radius;

    (0..cell_count)
        .map(|index| {
            let x = (index % size as usize) as f32;
            let y = (index / size as usize) as f32;
            let distance_sq = (x - center).powi(2) + (y - center).powi(2);
            if distance_sq <= radius_sq {
                TerrainKind::Land
            } else {
                TerrainKind::Water
            }
        })
        .collect()
}
