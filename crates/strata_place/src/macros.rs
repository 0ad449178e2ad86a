//! Placement macros: groups of blocks that move as one rigid unit.
//!
//! Every member sits at `head + offset` at all times. The head is the first
//! member and has a zero offset.

use crate::error::{PlaceError, PlaceResult};
use crate::ids::{BlockId, MacroId};
use crate::netlist::PlaceNetlist;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strata_arch::{Loc, LocOffset};

/// One member of a macro and its offset from the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroMember {
    /// The member block.
    pub block: BlockId,
    /// Displacement from the head block.
    pub offset: LocOffset,
}

/// A rigid group of blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementMacro {
    /// The unique ID of this macro.
    pub id: MacroId,
    members: Vec<MacroMember>,
}

impl PlacementMacro {
    /// The head block.
    pub fn head(&self) -> BlockId {
        self.members[0].block
    }

    /// Members in order, head first.
    pub fn members(&self) -> &[MacroMember] {
        &self.members
    }

    /// Location of every member when the head sits at `head_loc`.
    pub fn member_locs(&self, head_loc: Loc) -> impl Iterator<Item = (BlockId, Loc)> + '_ {
        self.members
            .iter()
            .map(move |m| (m.block, head_loc.offset(m.offset)))
    }

    /// Offset of `block` from the head, if it is a member.
    pub fn offset_of(&self, block: BlockId) -> Option<LocOffset> {
        self.members
            .iter()
            .find(|m| m.block == block)
            .map(|m| m.offset)
    }

    /// Whether `block` belongs to this macro.
    pub fn contains(&self, block: BlockId) -> bool {
        self.members.iter().any(|m| m.block == block)
    }
}

/// All macros of a design and the block-to-macro index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroRegistry {
    macros: Vec<PlacementMacro>,
    block_macro: HashMap<BlockId, MacroId>,
}

impl MacroRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a macro. The first member is the head and must have a zero
    /// offset; members and offsets must be distinct and no block may belong
    /// to two macros.
    pub fn add(&mut self, members: Vec<(BlockId, LocOffset)>) -> PlaceResult<MacroId> {
        let Some(&(_, head_offset)) = members.first() else {
            return Err(invalid("a macro needs at least one member"));
        };
        if head_offset != LocOffset::ZERO {
            return Err(invalid("the head member must have a zero offset"));
        }
        let mut offsets = HashSet::new();
        let mut blocks = HashSet::new();
        for &(block, offset) in &members {
            if !blocks.insert(block) {
                return Err(invalid(format!("block {block} listed twice")));
            }
            if !offsets.insert(offset) {
                return Err(invalid(format!(
                    "two members share offset ({}, {}, {})",
                    offset.dx, offset.dy, offset.dlayer
                )));
            }
            if self.block_macro.contains_key(&block) {
                return Err(invalid(format!("block {block} already belongs to a macro")));
            }
        }
        let id = MacroId::from_raw(self.macros.len() as u32);
        for &(block, _) in &members {
            self.block_macro.insert(block, id);
        }
        self.macros.push(PlacementMacro {
            id,
            members: members
                .into_iter()
                .map(|(block, offset)| MacroMember { block, offset })
                .collect(),
        });
        Ok(id)
    }

    /// Checks every member against the netlist: IDs in range, and either all
    /// or none of the members fixed.
    pub fn validate(&self, netlist: &PlaceNetlist) -> PlaceResult<()> {
        for m in &self.macros {
            if let Some(bad) = m
                .members
                .iter()
                .find(|mm| mm.block.index() >= netlist.block_count())
            {
                return Err(invalid(format!("macro {} references unknown block {}", m.id, bad.block)));
            }
            let fixed = m
                .members
                .iter()
                .filter(|mm| netlist.block(mm.block).fixed)
                .count();
            if fixed != 0 && fixed != m.members.len() {
                return Err(invalid(format!(
                    "macro {} mixes fixed and moveable members",
                    m.id
                )));
            }
        }
        Ok(())
    }

    /// The macro containing `block`, if any.
    pub fn macro_of(&self, block: BlockId) -> Option<MacroId> {
        self.block_macro.get(&block).copied()
    }

    /// Returns the macro with the given ID.
    pub fn get(&self, id: MacroId) -> &PlacementMacro {
        &self.macros[id.index()]
    }

    /// Iterates all macros.
    pub fn iter(&self) -> impl Iterator<Item = &PlacementMacro> {
        self.macros.iter()
    }

    /// Number of macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Whether no macros are registered.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

fn invalid(reason: impl Into<String>) -> PlaceError {
    PlaceError::InvalidMacro {
        reason: reason.into(),
    }
}
