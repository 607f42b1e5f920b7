use anchor_lang::prelude::*;
use crate::{utils::*, state::Position};

pub const BITMAP_WORD_SIZE: u32 = 128;

/// Aggregate of the live positions of a tick.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickData {
    pub total_expo: u128,
    pub total_pos: u64,
    // Stamped by the first position of an empty tick
    pub liquidation_penalty: Option<u8>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BitmapWord {
    pub index: u32,
    pub bits: u128,
}

/// Two-level bitmap of populated ticks. Leaf words are stored sparsely; the
/// summary keeps one bit per non-empty leaf word.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickBitmap {
    pub summary: Vec<u128>,
    // Sorted by index, never holds an empty word
    pub words: Vec<BitmapWord>,
}

fn split(bit: u32) -> (u32, u32) {
    (bit / BITMAP_WORD_SIZE, bit % BITMAP_WORD_SIZE)
}

fn mask_at_or_below(bit_pos: u32) -> u128 {
    if bit_pos == BITMAP_WORD_SIZE - 1 {
        u128::MAX
    } else {
        (1u128 << (bit_pos + 1)) - 1
    }
}

fn highest_bit(word: u128) -> u32 {
    BITMAP_WORD_SIZE - 1 - word.leading_zeros()
}

impl TickBitmap {
    // Set a bit to a known value (true to set, false to clear).
    pub fn set(&mut self, bit: u32, value: bool) {
        let (word_index, bit_pos) = split(bit);
        match self.words.binary_search_by_key(&word_index, |w| w.index) {
            Ok(i) => {
                if value {
                    self.words[i].bits |= 1u128 << bit_pos;
                } else {
                    self.words[i].bits &= !(1u128 << bit_pos);
                    if self.words[i].bits == 0 {
                        self.words.remove(i);
                        self.set_summary(word_index, false);
                    }
                }
            }
            Err(i) => {
                if value {
                    self.words.insert(
                        i,
                        BitmapWord {
                            index: word_index,
                            bits: 1u128 << bit_pos,
                        },
                    );
                    self.set_summary(word_index, true);
                }
            }
        }
    }

    fn set_summary(&mut self, word_index: u32, value: bool) {
        let (summary_pos, bit_pos) = split(word_index);
        let summary_pos = summary_pos as usize;
        while self.summary.len() <= summary_pos {
            self.summary.push(0);
        }
        if value {
            self.summary[summary_pos] |= 1u128 << bit_pos;
        } else {
            self.summary[summary_pos] &= !(1u128 << bit_pos);
        }
        while self.summary.last() == Some(&0) {
            self.summary.pop();
        }
    }

    pub fn is_set(&self, bit: u32) -> bool {
        let (word_index, bit_pos) = split(bit);
        match self.words.binary_search_by_key(&word_index, |w| w.index) {
            Ok(i) => self.words[i].bits & (1u128 << bit_pos) != 0,
            Err(_) => false,
        }
    }

    /// Highest set bit at or below `bit`.
    pub fn highest_at_or_below(&self, bit: u32) -> Option<u32> {
        let (word_index, bit_pos) = split(bit);
        if let Ok(i) = self.words.binary_search_by_key(&word_index, |w| w.index) {
            let masked = self.words[i].bits & mask_at_or_below(bit_pos);
            if masked != 0 {
                return Some(word_index * BITMAP_WORD_SIZE + highest_bit(masked));
            }
        }
        if word_index == 0 {
            return None;
        }
        let below = self.highest_word_at_or_below(word_index - 1)?;
        let i = self.words.binary_search_by_key(&below, |w| w.index).ok()?;
        Some(below * BITMAP_WORD_SIZE + highest_bit(self.words[i].bits))
    }

    pub fn highest(&self) -> Option<u32> {
        self.highest_at_or_below(u32::MAX)
    }

    fn highest_word_at_or_below(&self, word_index: u32) -> Option<u32> {
        if self.summary.is_empty() {
            return None;
        }
        let (summary_pos, bit_pos) = split(word_index);
        let (mut summary_pos, mut current) = if summary_pos as usize >= self.summary.len() {
            let last = self.summary.len() - 1;
            (last, self.summary[last])
        } else {
            let pos = summary_pos as usize;
            (pos, self.summary[pos] & mask_at_or_below(bit_pos))
        };
        loop {
            if current != 0 {
                return Some(summary_pos as u32 * BITMAP_WORD_SIZE + highest_bit(current));
            }
            if summary_pos == 0 {
                return None;
            }
            summary_pos -= 1;
            current = self.summary[summary_pos];
        }
    }
}

/// Per-tick arena: the version counter, the aggregate and the position slots.
/// Slots at or past `data.total_pos`, and every slot of an older version,
/// are unreachable.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickEntry {
    pub tick: i32,
    pub version: u64,
    pub data: TickData,
    pub positions: Vec<Position>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickIndex {
    pub spacing: i32,
    pub bitmap: TickBitmap,
    // Sorted by tick
    pub entries: Vec<TickEntry>,
}

impl TickIndex {
    pub fn new(spacing: i32) -> Self {
        TickIndex {
            spacing,
            ..TickIndex::default()
        }
    }

    fn bit_for_tick(&self, tick: i32) -> Result<u32> {
        let min = min_usable_tick(self.spacing);
        require!(
            tick >= min && tick <= max_usable_tick(self.spacing) && tick % self.spacing == 0,
            crate::VaultLongError::TickOutOfBounds
        );
        Ok(((tick - min) / self.spacing) as u32)
    }

    fn tick_for_bit(&self, bit: u32) -> i32 {
        min_usable_tick(self.spacing) + bit as i32 * self.spacing
    }

    pub fn entry(&self, tick: i32) -> Option<&TickEntry> {
        self.entries
            .binary_search_by_key(&tick, |e| e.tick)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub(crate) fn entry_mut(&mut self, tick: i32) -> Option<&mut TickEntry> {
        match self.entries.binary_search_by_key(&tick, |e| e.tick) {
            Ok(i) => Some(&mut self.entries[i]),
            Err(_) => None,
        }
    }

    pub(crate) fn entry_or_insert(&mut self, tick: i32) -> &mut TickEntry {
        let i = match self.entries.binary_search_by_key(&tick, |e| e.tick) {
            Ok(i) => i,
            Err(i) => {
                self.entries.insert(
                    i,
                    TickEntry {
                        tick,
                        ..TickEntry::default()
                    },
                );
                i
            }
        };
        &mut self.entries[i]
    }

    pub fn tick_data(&self, tick: i32) -> TickData {
        self.entry(tick).map(|e| e.data).unwrap_or_default()
    }

    pub fn tick_version(&self, tick: i32) -> u64 {
        self.entry(tick).map(|e| e.version).unwrap_or(0)
    }

    /// Stamped penalty of a populated tick, `current` otherwise.
    pub fn tick_liquidation_penalty(&self, tick: i32, current: u8) -> u8 {
        self.entry(tick)
            .and_then(|e| e.data.liquidation_penalty)
            .unwrap_or(current)
    }

    pub fn highest_populated_tick(&self) -> Option<i32> {
        self.bitmap.highest().map(|bit| self.tick_for_bit(bit))
    }

    pub(crate) fn mark_populated(&mut self, tick: i32, populated: bool) -> Result<()> {
        let bit = self.bit_for_tick(tick)?;
        self.bitmap.set(bit, populated);
        Ok(())
    }

    /// Clear an emptied tick. Entries that were never liquidated are dropped
    /// since their version is still the default.
    pub(crate) fn reset_tick(&mut self, tick: i32) -> Result<()> {
        self.mark_populated(tick, false)?;
        if let Ok(i) = self.entries.binary_search_by_key(&tick, |e| e.tick) {
            if self.entries[i].version == 0 {
                self.entries.remove(i);
            } else {
                let entry = &mut self.entries[i];
                entry.data = TickData::default();
                entry.positions.clear();
            }
        }
        Ok(())
    }

    /// Invalidate every position of `tick`. Returns the aggregate it held
    /// and the version that was liquidated.
    pub(crate) fn liquidate_tick(&mut self, tick: i32) -> Result<(TickData, u64)> {
        self.mark_populated(tick, false)?;
        let entry = self
            .entry_mut(tick)
            .ok_or(error!(crate::VaultLongError::PositionNotFound))?;
        let data = std::mem::take(&mut entry.data);
        let old_version = entry.version;
        entry.version = entry
            .version
            .checked_add(1)
            .ok_or(error!(crate::VaultLongError::MathOverflow))?;
        Ok((data, old_version))
    }
}
