#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardinalDir {
    Up,
    Down,
    Left,
    Right,
}

impl CardinalDir {
    /// Cell-step vector in grid coordinates; the grid shares the screen's
    /// +y-down orientation, so Up is negative y.
    fn step(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    fn as_token(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Nearest-cardinal bucketing of a drag vector. Sector edges belong to the
/// clockwise-next direction: right [-45°, 45°), down [45°, 135°),
/// up [-135°, -45°), left otherwise.
fn quantize_drag_direction(drag: Vec2) -> CardinalDir {
    let degrees = drag.y.atan2(drag.x).to_degrees();
    if (-45.0..45.0).contains(&degrees) {
        CardinalDir::Right
    } else if (45.0..135.0).contains(&degrees) {
        CardinalDir::Down
    } else if (-135.0..-45.0).contains(&degrees) {
        CardinalDir::Up
    } else {
        CardinalDir::Left
    }
}

fn item_kind_by_name(name: &str) -> Option<ItemKind> {
    match name {
        "seed" => Some(ItemKind::Seed),
        "coin" => Some(ItemKind::Coin),
        "shell" => Some(ItemKind::Shell),
        _ => None,
    }
}

fn item_renderable(kind: ItemKind) -> RenderableDesc {
    let (shape, color) = match kind {
        ItemKind::Seed => (ShapeKind::Diamond, [106, 190, 92, 255]),
        ItemKind::Coin => (ShapeKind::Circle, [240, 200, 80, 255]),
        ItemKind::Shell => (ShapeKind::Square, [226, 160, 188, 255]),
    };
    RenderableDesc {
        kind: RenderableKind::Shape { shape, color },
        debug_name: kind.as_token(),
    }
}

fn player_renderable() -> RenderableDesc {
    RenderableDesc {
        kind: RenderableKind::Shape {
            shape: ShapeKind::Circle,
            color: PLAYER_COLOR,
        },
        debug_name: "player",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LedgerEntry {
    kind: ItemKind,
    count: u32,
    first_collected_tick: u64,
}

/// Ordered inventory: one record per distinct kind, in first-collection
/// order. A record never sits at zero; `remove` deletes it when the count
/// runs out.
#[derive(Debug, Clone, PartialEq)]
struct InventoryLedger {
    entries: Vec<LedgerEntry>,
    max_distinct_kinds: u32,
}

impl InventoryLedger {
    /// `max_distinct_kinds` of 0 means unlimited.
    fn with_capacity(max_distinct_kinds: u32) -> Self {
        Self {
            entries: Vec::new(),
            max_distinct_kinds,
        }
    }

    /// Returns false when the capacity policy refuses a brand-new kind;
    /// counting up an existing kind always succeeds.
    fn add(&mut self, kind: ItemKind, tick: u64) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.kind == kind) {
            entry.count = entry.count.saturating_add(1);
            return true;
        }
        if self.max_distinct_kinds > 0 && self.entries.len() as u32 >= self.max_distinct_kinds {
            return false;
        }
        self.entries.push(LedgerEntry {
            kind,
            count: 1,
            first_collected_tick: tick,
        });
        true
    }

    /// Returns false when the kind is absent or holds fewer than `amount`.
    fn remove(&mut self, kind: ItemKind, amount: u32) -> bool {
        if amount == 0 {
            return true;
        }
        let Some(index) = self.entries.iter().position(|entry| entry.kind == kind) else {
            return false;
        };
        if self.entries[index].count < amount {
            return false;
        }
        self.entries[index].count -= amount;
        if self.entries[index].count == 0 {
            self.entries.remove(index);
        }
        true
    }

    fn count_of(&self, kind: ItemKind) -> u32 {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    fn total_count(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |sum, entry| sum.saturating_add(entry.count))
    }

    fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameplayEvent {
    MoveBlocked {
        from: GridPos,
        direction: CardinalDir,
    },
    ItemCollected {
        kind: ItemKind,
        cell: GridPos,
    },
    CollectionRejected {
        kind: ItemKind,
        cell: GridPos,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GameplayEventCounts {
    total: u32,
    move_blocked: u32,
    item_collected: u32,
    collection_rejected: u32,
}

impl GameplayEventCounts {
    fn record(&mut self, event: GameplayEvent) {
        self.total = self.total.saturating_add(1);
        match event {
            GameplayEvent::MoveBlocked { .. } => {
                self.move_blocked = self.move_blocked.saturating_add(1)
            }
            GameplayEvent::ItemCollected { .. } => {
                self.item_collected = self.item_collected.saturating_add(1)
            }
            GameplayEvent::CollectionRejected { .. } => {
                self.collection_rejected = self.collection_rejected.saturating_add(1)
            }
        }
    }
}

/// Per-tick hook surface for external collaborators (sound, UI flashes).
/// Events accumulate during a tick and roll into counts at its end.
#[derive(Debug, Default)]
struct GameplayEventBus {
    current_tick_events: Vec<GameplayEvent>,
    last_tick_counts: GameplayEventCounts,
}

impl GameplayEventBus {
    fn emit(&mut self, event: GameplayEvent) {
        self.current_tick_events.push(event);
    }

    fn events_this_tick(&self) -> &[GameplayEvent] {
        &self.current_tick_events
    }

    fn finish_tick_rollover(&mut self) {
        let mut counts = GameplayEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(*event);
        }
        self.last_tick_counts = counts;
        self.current_tick_events.clear();
    }

    fn last_tick_counts(&self) -> GameplayEventCounts {
        self.last_tick_counts
    }
}
