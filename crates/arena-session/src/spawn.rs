//! Spawn point pool.

use std::collections::{BTreeMap, VecDeque};

use arena_types::{PlayerId, SpawnPoint};
use tracing::debug;

use crate::SessionError;

/// Free spawn points plus the point each player currently holds.
///
/// `free().len() + assigned() == total()` holds after every call. Not
/// synchronized; the owning session is the only caller.
#[derive(Debug, Clone, Default)]
pub struct SpawnAllocator {
    free: VecDeque<SpawnPoint>,
    assigned: BTreeMap<PlayerId, SpawnPoint>,
}

impl SpawnAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds points to the free pool. The mutator pipeline calls this once,
    /// before anyone joins.
    pub fn seed(&mut self, points: impl IntoIterator<Item = SpawnPoint>) {
        let before = self.free.len();
        self.free.extend(points);
        debug!(added = self.free.len() - before, total = self.total(), "spawn pool seeded");
    }

    /// Hands the player a spawn point. A player that already holds one gets
    /// the same point back.
    pub fn assign(&mut self, player: PlayerId) -> Result<SpawnPoint, SessionError> {
        if let Some(point) = self.assigned.get(&player) {
            return Ok(*point);
        }
        let point = self
            .free
            .pop_front()
            .ok_or(SessionError::NoSpawnAvailable(player))?;
        self.assigned.insert(player, point);
        Ok(point)
    }

    /// Returns the player's point to the free pool. No-op for players
    /// without one.
    pub fn release(&mut self, player: PlayerId) -> Option<SpawnPoint> {
        let point = self.assigned.remove(&player)?;
        self.free.push_back(point);
        Some(point)
    }

    /// `true` when no free point is left.
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub fn spawn_of(&self, player: PlayerId) -> Option<SpawnPoint> {
        self.assigned.get(&player).copied()
    }

    pub fn free(&self) -> usize {
        self.free.len()
    }

    pub fn assigned(&self) -> usize {
        self.assigned.len()
    }

    pub fn total(&self) -> usize {
        self.free.len() + self.assigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: i32) -> SpawnAllocator {
        let mut spawns = SpawnAllocator::new();
        spawns.seed((0..n).map(|i| SpawnPoint::on_block(i * 10, 64, 0)));
        spawns
    }

    #[test]
    fn test_assign_takes_points_until_full() {
        let mut spawns = pool(2);
        assert!(!spawns.is_full());

        let a = spawns.assign(PlayerId(1)).unwrap();
        let b = spawns.assign(PlayerId(2)).unwrap();
        assert_ne!(a, b);
        assert!(spawns.is_full());
        assert_eq!(
            spawns.assign(PlayerId(3)),
            Err(SessionError::NoSpawnAvailable(PlayerId(3)))
        );
        assert_eq!(spawns.total(), 2);
    }

    #[test]
    fn test_assign_same_player_returns_same_point() {
        let mut spawns = pool(3);
        let first = spawns.assign(PlayerId(1)).unwrap();
        let again = spawns.assign(PlayerId(1)).unwrap();
        assert_eq!(first, again);
        assert_eq!(spawns.assigned(), 1);
        assert_eq!(spawns.free(), 2);
    }

    #[test]
    fn test_release_returns_point_to_pool() {
        let mut spawns = pool(1);
        let point = spawns.assign(PlayerId(1)).unwrap();
        assert_eq!(spawns.release(PlayerId(1)), Some(point));
        assert_eq!(spawns.release(PlayerId(1)), None);
        assert_eq!(spawns.free(), 1);
        assert_eq!(spawns.spawn_of(PlayerId(1)), None);
        assert_eq!(spawns.assign(PlayerId(2)).unwrap(), point);
    }

    #[test]
    fn test_conservation_holds_across_operations() {
        let mut spawns = pool(4);
        for id in 1..=6 {
            let _ = spawns.assign(PlayerId(id));
            assert_eq!(spawns.free() + spawns.assigned(), 4);
        }
        for id in [2, 4, 9] {
            spawns.release(PlayerId(id));
            assert_eq!(spawns.free() + spawns.assigned(), 4);
        }
    }

    #[test]
    fn test_empty_pool_is_full() {
        assert!(SpawnAllocator::new().is_full());
    }
}
