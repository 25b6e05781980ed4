#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded recycler for falling-glyph entities.
//!
//! Glyphs live in a dense, index-stable slot vector. Vacant slot indices sit
//! in a min-heap so acquisitions always fill the lowest hole first, which
//! keeps the tail of the vector vacant and lets [`GlyphPool::trim`] shrink
//! it. Every acquisition stamps a pool-wide serial into the [`GlyphId`], so a
//! handle that outlives its glyph never matches the slot's next occupant and
//! a second release is rejected instead of double counting.

use std::{cmp::Reverse, collections::BinaryHeap};

use glam::Vec2;
use glyph_rain_core::{FallingGlyph, GlyphId, PoolError};

const DEFAULT_INITIAL_SIZE: usize = 12;
const DEFAULT_MAX_SIZE: usize = 32;

/// Sizing parameters for the glyph pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    initial_size: usize,
    max_size: usize,
}

impl PoolConfig {
    /// Creates a configuration that pre-warms `initial_size` slots and never
    /// exceeds `max_size`. The watermark is clamped to the ceiling.
    #[must_use]
    pub const fn new(initial_size: usize, max_size: usize) -> Self {
        let initial_size = if initial_size > max_size {
            max_size
        } else {
            initial_size
        };
        Self {
            initial_size,
            max_size,
        }
    }

    /// Number of slots created up front and retained by [`GlyphPool::trim`].
    #[must_use]
    pub const fn initial_size(&self) -> usize {
        self.initial_size
    }

    /// Maximum number of simultaneously live glyphs.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_SIZE, DEFAULT_MAX_SIZE)
    }
}

/// Fixed-capacity arena of falling glyphs.
#[derive(Debug)]
pub struct GlyphPool {
    slots: Vec<Option<FallingGlyph>>,
    vacant: BinaryHeap<Reverse<u32>>,
    active: usize,
    initial_size: usize,
    max_size: usize,
    total_created: usize,
    next_serial: u64,
}

impl GlyphPool {
    /// Creates a pool with its watermark of vacant slots already allocated.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        let initial_size = config.initial_size();
        let mut slots = Vec::with_capacity(config.max_size());
        slots.resize(initial_size, None);
        let vacant = (0..initial_size)
            .filter_map(|index| u32::try_from(index).ok())
            .map(Reverse)
            .collect();
        Self {
            slots,
            vacant,
            active: 0,
            initial_size,
            max_size: config.max_size(),
            total_created: initial_size,
            next_serial: 0,
        }
    }

    /// Places a glyph on the field, recycling a vacant slot when one exists.
    pub fn acquire(
        &mut self,
        glyph: char,
        position: Vec2,
        velocity: f32,
    ) -> Result<GlyphId, PoolError> {
        let exhausted = PoolError::Exhausted {
            capacity: self.max_size,
        };
        let slot = match self.vacant.pop() {
            Some(Reverse(slot)) => slot,
            None if self.slots.len() < self.max_size => {
                let slot = u32::try_from(self.slots.len()).map_err(|_| exhausted)?;
                self.slots.push(None);
                self.total_created += 1;
                slot
            }
            None => return Err(exhausted),
        };

        self.next_serial += 1;
        let id = GlyphId::new(slot, self.next_serial);
        self.slots[slot as usize] = Some(FallingGlyph::spawn(id, glyph, position, velocity));
        self.active += 1;
        Ok(id)
    }

    /// Returns a glyph to the pool, yielding its final state.
    ///
    /// Releasing a handle whose glyph is already gone leaves every counter
    /// untouched and reports [`PoolError::DoubleRelease`].
    pub fn release(&mut self, id: GlyphId) -> Result<FallingGlyph, PoolError> {
        let taken = self
            .slots
            .get_mut(id.slot() as usize)
            .filter(|slot| matches!(slot, Some(glyph) if glyph.id() == id))
            .and_then(Option::take);
        let Some(mut glyph) = taken else {
            log::warn!("ignoring release of glyph {id:?}: not live");
            return Err(PoolError::DoubleRelease { id });
        };

        glyph.deactivate();
        self.active -= 1;
        self.vacant.push(Reverse(id.slot()));
        Ok(glyph)
    }

    /// Releases every live glyph, returning how many were on the field.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                if let Ok(index) = u32::try_from(index) {
                    self.vacant.push(Reverse(index));
                }
                released += 1;
            }
        }
        self.active = 0;
        released
    }

    /// Drops trailing vacant slots until only the initial watermark remains pooled.
    ///
    /// Vacant slots below a live glyph stay allocated; the index of a live
    /// glyph never moves.
    pub fn trim(&mut self) -> usize {
        let mut pooled = self.vacant.len();
        let mut removed = 0;
        while pooled > self.initial_size && matches!(self.slots.last(), Some(None)) {
            let _ = self.slots.pop();
            pooled -= 1;
            removed += 1;
        }

        if removed > 0 {
            let len = self.slots.len();
            self.vacant.retain(|Reverse(slot)| (*slot as usize) < len);
            self.slots.shrink_to(self.max_size.min(len.max(self.initial_size)));
            log::debug!("trimmed {removed} vacant glyph slots, {pooled} remain pooled");
        }
        removed
    }

    /// Looks up a live glyph.
    #[must_use]
    pub fn get(&self, id: GlyphId) -> Option<&FallingGlyph> {
        self.slots
            .get(id.slot() as usize)?
            .as_ref()
            .filter(|glyph| glyph.id() == id)
    }

    /// Looks up a live glyph mutably.
    pub fn get_mut(&mut self, id: GlyphId) -> Option<&mut FallingGlyph> {
        self.slots
            .get_mut(id.slot() as usize)?
            .as_mut()
            .filter(|glyph| glyph.id() == id)
    }

    /// Iterates over live glyphs in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = &FallingGlyph> {
        self.slots.iter().flatten()
    }

    /// Iterates mutably over live glyphs in slot order.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut FallingGlyph> {
        self.slots.iter_mut().flatten()
    }

    /// Number of glyphs currently on the field.
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active
    }

    /// Number of vacant slots ready for reuse.
    #[must_use]
    pub fn pooled_count(&self) -> usize {
        self.vacant.len()
    }

    /// Number of slots allocated over the pool's lifetime.
    #[must_use]
    pub const fn total_created(&self) -> usize {
        self.total_created
    }

    /// Maximum number of simultaneously live glyphs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_size
    }

    /// Number of additional glyphs that can be acquired right now.
    #[must_use]
    pub const fn available(&self) -> usize {
        self.max_size.saturating_sub(self.active)
    }
}

impl Default for GlyphPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_clamps_watermark_to_ceiling() {
        let config = PoolConfig::new(10, 4);
        assert_eq!(config.initial_size(), 4);
        assert_eq!(config.max_size(), 4);
    }

    #[test]
    fn prewarmed_slots_are_pooled() {
        let pool = GlyphPool::new(PoolConfig::new(3, 8));
        assert_eq!(pool.pooled_count(), 3);
        assert_eq!(pool.total_created(), 3);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn acquisition_fills_lowest_vacant_slot() {
        let mut pool = GlyphPool::new(PoolConfig::new(0, 4));
        let first = pool.acquire('a', Vec2::ZERO, 1.0).expect("first");
        let second = pool.acquire('b', Vec2::ZERO, 1.0).expect("second");
        let _third = pool.acquire('c', Vec2::ZERO, 1.0).expect("third");

        let _ = pool.release(second).expect("release second");
        let _ = pool.release(first).expect("release first");

        let reused = pool.acquire('d', Vec2::ZERO, 1.0).expect("reuse");
        assert_eq!(reused.slot(), first.slot());
        assert!(reused.serial() > first.serial());
    }
}
