//! Particles and the slot arena that holds the live set.

use std::fmt;

use serde::Serialize;

/// Particle identity: spawn tick plus index within that tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParticleId {
    pub tick: u64,
    pub index: u32,
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tick, self.index)
    }
}

/// A dot travelling along one route.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    /// Index into the route table.
    pub route: usize,
    /// Index into the route table's group list.
    pub group: usize,
    /// Arclength units per tick, always positive.
    pub speed: f64,
    /// Lateral offset from the band center.
    pub lateral_offset: f64,
    /// Tick the particle was spawned on.
    pub created_at: u64,
    /// Arclength position, written by the stepper only.
    pub current_pos: f64,
    /// Cached point count of the route when the particle was spawned.
    pub route_length: usize,
}

impl Particle {
    /// Arclength position at `tick` under the linear motion model.
    #[inline]
    pub fn position_at(&self, tick: u64) -> f64 {
        tick.saturating_sub(self.created_at) as f64 * self.speed
    }

    /// In-flight to arrived is one-way and depends only on position.
    #[inline]
    pub fn is_arrived(&self) -> bool {
        self.current_pos >= self.route_length as f64
    }
}

/// Slot arena with a free list. Slot indices stay stable while a particle lives.
#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    slots: Vec<Option<Particle>>,
    free: Vec<usize>,
    live: usize,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Insert a particle, reusing a reclaimed slot when one is free.
    pub fn insert(&mut self, particle: Particle) -> usize {
        self.live += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(particle);
                slot
            }
            None => {
                self.slots.push(Some(particle));
                self.slots.len() - 1
            }
        }
    }

    /// Reclaim a slot, returning its particle.
    pub fn remove(&mut self, slot: usize) -> Option<Particle> {
        let particle = self.slots.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.live -= 1;
        Some(particle)
    }

    pub fn get(&self, slot: usize) -> Option<&Particle> {
        self.slots.get(slot)?.as_ref()
    }

    /// Number of live particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total slots, live or reclaimed.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live particles in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().flatten()
    }

    /// Live particles with their slots.
    pub fn iter_slots_mut(&mut self) -> impl Iterator<Item = (usize, &mut Particle)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, p)| p.as_mut().map(|p| (slot, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(tick: u64, index: u32) -> Particle {
        Particle {
            id: ParticleId { tick, index },
            route: 0,
            group: 0,
            speed: 1.0,
            lateral_offset: 0.0,
            created_at: tick,
            current_pos: 0.0,
            route_length: 100,
        }
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ParticleId { tick: 12, index: 3 }.to_string(), "12_3");
    }

    #[test]
    fn test_slot_reuse() {
        let mut store = ParticleStore::new();
        let a = store.insert(particle(0, 0));
        let b = store.insert(particle(0, 1));
        assert_eq!(store.len(), 2);

        let removed = store.remove(a).unwrap();
        assert_eq!(removed.id.index, 0);
        assert_eq!(store.len(), 1);
        assert!(store.remove(a).is_none());

        let c = store.insert(particle(1, 0));
        assert_eq!(c, a);
        assert_eq!(store.capacity(), 2);
        assert_eq!(store.get(b).unwrap().id.index, 1);
        assert_eq!(store.iter().count(), 2);
    }

    #[test]
    fn test_arrival_boundary() {
        let mut p = particle(0, 0);
        p.current_pos = p.position_at(99);
        assert!(!p.is_arrived());
        p.current_pos = p.position_at(100);
        assert!(p.is_arrived());
    }

    #[test]
    fn test_position_before_creation_is_zero() {
        let p = particle(10, 0);
        assert_eq!(p.position_at(5), 0.0);
        assert_eq!(p.position_at(15), 5.0);
    }
}
