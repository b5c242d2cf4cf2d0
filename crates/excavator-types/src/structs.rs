//! Compound value types: target sets, inventories, and loose item entities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::{CellType, ItemType};
use crate::geometry::{Position, Vec3};

// ---------------------------------------------------------------------------
// Target set
// ---------------------------------------------------------------------------

/// The non-empty, deduplicated list of cell types an excavation seeks.
///
/// Order is preserved: the first target decides which item is counted
/// against a desired quantity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSet {
    cells: Vec<CellType>,
}

impl TargetSet {
    /// Build a target set, returning `None` when `cells` is empty.
    pub fn new(cells: impl IntoIterator<Item = CellType>) -> Option<Self> {
        let mut deduped: Vec<CellType> = Vec::new();
        for cell in cells {
            if !deduped.contains(&cell) {
                deduped.push(cell);
            }
        }
        if deduped.is_empty() {
            None
        } else {
            Some(Self { cells: deduped })
        }
    }

    /// The target cell types in their original order.
    pub fn cells(&self) -> &[CellType] {
        &self.cells
    }

    /// The first target, whose drop is counted toward a desired quantity.
    pub fn primary(&self) -> Option<CellType> {
        self.cells.first().copied()
    }

    /// Whether `cell` is one of the targets.
    pub fn contains(&self, cell: CellType) -> bool {
        self.cells.contains(&cell)
    }

    /// Number of target cell types.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Keep only the targets for which `keep` returns `true`.
    ///
    /// Returns `None` when nothing would remain, leaving `self` unchanged.
    pub fn retained(&self, mut keep: impl FnMut(CellType) -> bool) -> Option<Self> {
        Self::new(self.cells.iter().copied().filter(|cell| keep(*cell)))
    }

    /// Items that count as a loose form of any target: each target's
    /// natural drop and its raw item form.
    pub fn resource_items(&self) -> Vec<ItemType> {
        let mut items = Vec::new();
        for cell in &self.cells {
            for item in [cell.drop_item(), cell.raw_item()].into_iter().flatten() {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        items
    }
}

impl fmt::Display for TargetSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(cell.name())?;
        }
        f.write_str("]")
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// A stack of identical items in one inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// The item kind.
    pub item: ItemType,
    /// How many items the stack holds.
    pub count: u32,
}

impl ItemStack {
    /// Create a stack.
    pub const fn new(item: ItemType, count: u32) -> Self {
        Self { item, count }
    }

    /// Whether the stack has reached the item's maximum stack size.
    pub const fn is_full(&self) -> bool {
        self.count >= self.item.max_stack_size()
    }
}

/// The agent's main inventory: a fixed number of optional stacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
}

impl Inventory {
    /// Number of slots in a main inventory.
    pub const SLOTS: usize = 36;

    /// An inventory with every slot empty.
    pub fn empty() -> Self {
        Self {
            slots: vec![None; Self::SLOTS],
        }
    }

    /// Build an inventory from explicit slot contents, padded or truncated
    /// to [`Self::SLOTS`].
    pub fn from_slots(slots: impl IntoIterator<Item = Option<ItemStack>>) -> Self {
        let mut slots: Vec<_> = slots.into_iter().take(Self::SLOTS).collect();
        slots.resize(Self::SLOTS, None);
        Self { slots }
    }

    /// The slot contents.
    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Total count of `item` across all slots.
    pub fn count_of(&self, item: ItemType) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }

    /// Whether at least one slot is empty.
    pub fn has_empty_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Whether some existing stack of `item` can still grow.
    pub fn has_partial_stack_of(&self, item: ItemType) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|stack| stack.item == item && !stack.is_full())
    }

    /// Add items, topping up partial stacks first, then filling empty
    /// slots. Returns the number of items that did not fit.
    pub fn insert(&mut self, item: ItemType, mut count: u32) -> u32 {
        let max = item.max_stack_size();
        for stack in self.slots.iter_mut().flatten() {
            if count == 0 {
                break;
            }
            if stack.item == item && stack.count < max {
                let moved = max.saturating_sub(stack.count).min(count);
                stack.count = stack.count.saturating_add(moved);
                count = count.saturating_sub(moved);
            }
        }
        for slot in &mut self.slots {
            if count == 0 {
                break;
            }
            if slot.is_none() {
                let moved = max.min(count);
                *slot = Some(ItemStack::new(item, moved));
                count = count.saturating_sub(moved);
            }
        }
        count
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Item entities
// ---------------------------------------------------------------------------

/// A loose item lying in the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemEntity {
    /// Continuous position of the entity.
    pub position: Vec3,
    /// The item it carries.
    pub item: ItemType,
    /// How many items it carries.
    pub count: u32,
}

impl ItemEntity {
    /// The cell the entity currently occupies.
    pub fn cell(&self) -> Position {
        Position::containing(self.position)
    }
}

/// Anything the world reports as a loaded entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    /// A loose item stack on the ground.
    Item(ItemEntity),
    /// Any other entity (mobs, players, projectiles).
    Other {
        /// Continuous position of the entity.
        position: Vec3,
    },
}

impl Entity {
    /// The item entity, if this is one.
    pub const fn as_item(&self) -> Option<&ItemEntity> {
        match self {
            Self::Item(item) => Some(item),
            Self::Other { .. } => None,
        }
    }
}
