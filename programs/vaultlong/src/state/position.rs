use anchor_lang::prelude::*;
use crate::{constants::NO_POSITION_TICK, state::TickIndex, VaultLongError};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    // The owner of the position, recipient of the open
    pub owner: Pubkey,

    // False until the open is validated
    pub validated: bool,

    // Timestamp of the open initiation
    pub timestamp: i64,

    // Price-independent exposure
    pub total_expo: u128,

    // The collateral amount
    pub amount: u128,
}

/// Handle to a position. Only valid while `tick_version` is the current
/// version of `tick`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionId {
    pub tick: i32,
    pub tick_version: u64,
    pub index: u64,
}

impl PositionId {
    pub fn none() -> Self {
        PositionId {
            tick: NO_POSITION_TICK,
            tick_version: 0,
            index: 0,
        }
    }
}

/// Slot moved by a swap-delete: the position formerly at `from` is now at `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovedSlot {
    pub from: PositionId,
    pub to: PositionId,
}

impl TickIndex {
    fn live_entry(&self, id: &PositionId) -> Result<&crate::state::TickEntry> {
        let entry = self.entry(id.tick);
        let version = entry.map(|e| e.version).unwrap_or(0);
        require!(version == id.tick_version, VaultLongError::OutdatedTick);
        let entry = entry.ok_or(error!(VaultLongError::PositionNotFound))?;
        require!(id.index < entry.data.total_pos, VaultLongError::PositionNotFound);
        Ok(entry)
    }

    pub fn position(&self, id: &PositionId) -> Result<&Position> {
        let entry = self.live_entry(id)?;
        entry
            .positions
            .get(id.index as usize)
            .ok_or(error!(VaultLongError::PositionNotFound))
    }

    pub(crate) fn position_mut(&mut self, id: &PositionId) -> Result<&mut Position> {
        self.live_entry(id)?;
        self.entry_mut(id.tick)
            .and_then(|e| e.positions.get_mut(id.index as usize))
            .ok_or(error!(VaultLongError::PositionNotFound))
    }

    /// Append at the tick's position count. The first position of an empty
    /// tick stamps `penalty` on it.
    pub(crate) fn append_position(
        &mut self,
        tick: i32,
        position: Position,
        penalty: u8,
    ) -> Result<PositionId> {
        self.mark_populated(tick, true)?;
        let entry = self.entry_or_insert(tick);
        if entry.data.total_pos == 0 {
            entry.data.liquidation_penalty = Some(penalty);
        }
        let index = entry.data.total_pos;
        entry.data.total_expo = entry
            .data
            .total_expo
            .checked_add(position.total_expo)
            .ok_or(error!(VaultLongError::MathOverflow))?;
        if (index as usize) < entry.positions.len() {
            entry.positions[index as usize] = position;
        } else {
            entry.positions.push(position);
        }
        entry.data.total_pos += 1;
        Ok(PositionId {
            tick,
            tick_version: entry.version,
            index,
        })
    }

    /// Swap-delete. Removing the last position of a tick resets it.
    pub(crate) fn remove_position(
        &mut self,
        id: &PositionId,
    ) -> Result<(Position, Option<MovedSlot>)> {
        self.live_entry(id)?;
        let entry = self
            .entry_mut(id.tick)
            .ok_or(error!(VaultLongError::PositionNotFound))?;
        let last = entry.data.total_pos - 1;
        let index = id.index as usize;
        let removed = entry.positions[index];
        entry.positions.swap(index, last as usize);
        entry.positions.truncate(last as usize);
        entry.data.total_pos = last;
        entry.data.total_expo = entry
            .data
            .total_expo
            .checked_sub(removed.total_expo)
            .ok_or(error!(VaultLongError::MathUnderflow))?;

        let moved = (id.index != last).then(|| MovedSlot {
            from: PositionId {
                index: last,
                ..*id
            },
            to: *id,
        });
        if last == 0 {
            self.reset_tick(id.tick)?;
        }
        Ok((removed, moved))
    }

    /// Reduce a position in place, keeping the tick aggregate in sync.
    pub(crate) fn reduce_position(
        &mut self,
        id: &PositionId,
        amount: u128,
        total_expo: u128,
    ) -> Result<()> {
        let position = self.position_mut(id)?;
        position.amount = position
            .amount
            .checked_sub(amount)
            .ok_or(error!(VaultLongError::MathUnderflow))?;
        position.total_expo = position
            .total_expo
            .checked_sub(total_expo)
            .ok_or(error!(VaultLongError::MathUnderflow))?;
        let entry = self
            .entry_mut(id.tick)
            .ok_or(error!(VaultLongError::PositionNotFound))?;
        entry.data.total_expo = entry
            .data
            .total_expo
            .checked_sub(total_expo)
            .ok_or(error!(VaultLongError::MathUnderflow))?;
        Ok(())
    }

    /// Replace the exposure of a position, returning the previous one.
    pub(crate) fn set_position_expo(&mut self, id: &PositionId, total_expo: u128) -> Result<u128> {
        let position = self.position_mut(id)?;
        let old = position.total_expo;
        position.total_expo = total_expo;
        let entry = self
            .entry_mut(id.tick)
            .ok_or(error!(VaultLongError::PositionNotFound))?;
        entry.data.total_expo = entry
            .data
            .total_expo
            .checked_sub(old)
            .and_then(|v| v.checked_add(total_expo))
            .ok_or(error!(VaultLongError::MathOverflow))?;
        Ok(old)
    }
}
