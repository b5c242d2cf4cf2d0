//! Cell and item palettes.
//!
//! [`CellType`] is the closed set of voxel kinds the world can hold, with the
//! physical properties excavation cares about. [`ItemType`] covers the loose
//! items those cells turn into, either as their natural drop or as their own
//! raw item form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a cell-type name is not part of the palette.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cell type: {name}")]
pub struct ParseCellTypeError {
    /// The name that failed to parse.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A kind of cell in the voxel world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// Empty space.
    Air,
    /// Natural stone.
    Stone,
    /// Broken stone.
    Cobblestone,
    /// Soil.
    Dirt,
    /// Soil with a grass cover.
    Grass,
    /// Loose sand, falls when unsupported.
    Sand,
    /// Loose red sand, falls when unsupported.
    RedSand,
    /// Loose gravel, falls when unsupported.
    Gravel,
    /// Dyed powder, falls when unsupported.
    ConcretePowder,
    /// Soft clay.
    Clay,
    /// Coal-bearing stone.
    CoalOre,
    /// Iron-bearing stone.
    IronOre,
    /// Gold-bearing stone.
    GoldOre,
    /// Diamond-bearing stone.
    DiamondOre,
    /// Transparent glass.
    Glass,
    /// Indestructible floor and ceiling material.
    Bedrock,
    /// Water source or flow.
    Water,
    /// Lava source or flow.
    Lava,
}

impl CellType {
    /// Every cell type, in declaration order.
    pub const ALL: [Self; 18] = [
        Self::Air,
        Self::Stone,
        Self::Cobblestone,
        Self::Dirt,
        Self::Grass,
        Self::Sand,
        Self::RedSand,
        Self::Gravel,
        Self::ConcretePowder,
        Self::Clay,
        Self::CoalOre,
        Self::IronOre,
        Self::GoldOre,
        Self::DiamondOre,
        Self::Glass,
        Self::Bedrock,
        Self::Water,
        Self::Lava,
    ];

    /// Stable snake_case name, as used in configuration and commands.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Stone => "stone",
            Self::Cobblestone => "cobblestone",
            Self::Dirt => "dirt",
            Self::Grass => "grass",
            Self::Sand => "sand",
            Self::RedSand => "red_sand",
            Self::Gravel => "gravel",
            Self::ConcretePowder => "concrete_powder",
            Self::Clay => "clay",
            Self::CoalOre => "coal_ore",
            Self::IronOre => "iron_ore",
            Self::GoldOre => "gold_ore",
            Self::DiamondOre => "diamond_ore",
            Self::Glass => "glass",
            Self::Bedrock => "bedrock",
            Self::Water => "water",
            Self::Lava => "lava",
        }
    }

    /// Whether the cell is empty space.
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Whether the cell is a liquid.
    pub const fn is_liquid(self) -> bool {
        matches!(self, Self::Water | Self::Lava)
    }

    /// Whether the cell falls when the cell beneath it is removed.
    pub const fn is_falling(self) -> bool {
        matches!(
            self,
            Self::Sand | Self::RedSand | Self::Gravel | Self::ConcretePowder
        )
    }

    /// Whether the cell can never be broken.
    pub const fn is_indestructible(self) -> bool {
        matches!(self, Self::Bedrock)
    }

    /// Whether the cell blocks movement and line of sight.
    pub const fn is_solid(self) -> bool {
        !self.is_air() && !self.is_liquid()
    }

    /// Break hardness, or `None` when the cell cannot be broken at all.
    pub const fn hardness(self) -> Option<f32> {
        match self {
            Self::Air => Some(0.0),
            Self::Sand | Self::RedSand | Self::Dirt | Self::ConcretePowder | Self::Clay => {
                Some(0.5)
            }
            Self::Grass | Self::Gravel => Some(0.6),
            Self::Glass => Some(0.3),
            Self::Stone => Some(1.5),
            Self::Cobblestone => Some(2.0),
            Self::CoalOre | Self::IronOre | Self::GoldOre | Self::DiamondOre => Some(3.0),
            Self::Bedrock | Self::Water | Self::Lava => None,
        }
    }

    /// The item this cell yields when broken.
    pub const fn drop_item(self) -> Option<ItemType> {
        match self {
            Self::Air | Self::Bedrock | Self::Water | Self::Lava | Self::Glass => None,
            Self::Stone | Self::Cobblestone => Some(ItemType::Cobblestone),
            Self::Dirt | Self::Grass => Some(ItemType::Dirt),
            Self::Sand => Some(ItemType::Sand),
            Self::RedSand => Some(ItemType::RedSand),
            Self::Gravel => Some(ItemType::Gravel),
            Self::ConcretePowder => Some(ItemType::ConcretePowder),
            Self::Clay => Some(ItemType::ClayBall),
            Self::CoalOre => Some(ItemType::Coal),
            Self::IronOre => Some(ItemType::IronOre),
            Self::GoldOre => Some(ItemType::GoldOre),
            Self::DiamondOre => Some(ItemType::Diamond),
        }
    }

    /// The cell's own item form, independent of what it drops.
    pub const fn raw_item(self) -> Option<ItemType> {
        match self {
            Self::Air | Self::Bedrock | Self::Water | Self::Lava => None,
            Self::Stone => Some(ItemType::Stone),
            Self::Cobblestone => Some(ItemType::Cobblestone),
            Self::Dirt => Some(ItemType::Dirt),
            Self::Grass => Some(ItemType::Grass),
            Self::Sand => Some(ItemType::Sand),
            Self::RedSand => Some(ItemType::RedSand),
            Self::Gravel => Some(ItemType::Gravel),
            Self::ConcretePowder => Some(ItemType::ConcretePowder),
            Self::Clay => Some(ItemType::Clay),
            Self::CoalOre => Some(ItemType::CoalOre),
            Self::IronOre => Some(ItemType::IronOre),
            Self::GoldOre => Some(ItemType::GoldOre),
            Self::DiamondOre => Some(ItemType::DiamondOre),
            Self::Glass => Some(ItemType::Glass),
        }
    }

    /// Whether the persistent region cache indexes occurrences of this cell.
    pub const fn is_tracked(self) -> bool {
        matches!(
            self,
            Self::CoalOre | Self::IronOre | Self::GoldOre | Self::DiamondOre
        )
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CellType {
    type Err = ParseCellTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = wanted.strip_prefix("minecraft:").unwrap_or(&wanted);
        Self::ALL
            .into_iter()
            .find(|cell| cell.name() == wanted)
            .ok_or_else(|| ParseCellTypeError {
                name: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A kind of item that can lie on the ground or sit in an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Stone block item.
    Stone,
    /// Cobblestone block item.
    Cobblestone,
    /// Dirt block item.
    Dirt,
    /// Grass block item.
    Grass,
    /// Sand block item.
    Sand,
    /// Red sand block item.
    RedSand,
    /// Gravel block item.
    Gravel,
    /// Concrete powder block item.
    ConcretePowder,
    /// Clay block item.
    Clay,
    /// Clay ball dropped by clay.
    ClayBall,
    /// Coal dropped by coal ore.
    Coal,
    /// Coal ore block item.
    CoalOre,
    /// Iron ore block item.
    IronOre,
    /// Gold ore block item.
    GoldOre,
    /// Diamond dropped by diamond ore.
    Diamond,
    /// Diamond ore block item.
    DiamondOre,
    /// Glass block item.
    Glass,
    /// A shovel, the fastest tool for loose cells.
    Shovel,
    /// A pickaxe, the fastest tool for stone and ores.
    Pickaxe,
}

impl ItemType {
    /// Largest stack a single inventory slot holds.
    pub const fn max_stack_size(self) -> u32 {
        match self {
            Self::Shovel | Self::Pickaxe => 1,
            _ => 64,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for cell in CellType::ALL {
            assert_eq!(cell.name().parse::<CellType>().unwrap(), cell);
        }
    }

    #[test]
    fn namespaced_and_mixed_case_names_parse() {
        assert_eq!("minecraft:sand".parse::<CellType>().unwrap(), CellType::Sand);
        assert_eq!(" Red_Sand ".parse::<CellType>().unwrap(), CellType::RedSand);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "obsidian".parse::<CellType>().unwrap_err();
        assert_eq!(err.name, "obsidian");
    }

    #[test]
    fn serde_names_match_display_names() {
        let json = serde_json::to_string(&CellType::ConcretePowder).unwrap();
        assert_eq!(json, "\"concrete_powder\"");
    }

    #[test]
    fn falling_cells_are_the_loose_ones() {
        let falling: Vec<_> = CellType::ALL.into_iter().filter(|c| c.is_falling()).collect();
        assert_eq!(
            falling,
            vec![
                CellType::Sand,
                CellType::RedSand,
                CellType::Gravel,
                CellType::ConcretePowder
            ]
        );
    }

    #[test]
    fn ores_differ_between_drop_and_raw_form() {
        assert_eq!(CellType::CoalOre.drop_item(), Some(ItemType::Coal));
        assert_eq!(CellType::CoalOre.raw_item(), Some(ItemType::CoalOre));
        assert_eq!(CellType::Sand.drop_item(), CellType::Sand.raw_item());
    }

    #[test]
    fn unbreakable_cells_have_no_hardness() {
        assert!(CellType::Bedrock.hardness().is_none());
        assert!(CellType::Water.hardness().is_none());
        assert!(CellType::Sand.hardness().is_some());
    }
}
