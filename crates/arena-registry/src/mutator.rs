//! Content seeding before a session opens.

use std::collections::HashMap;

use arena_session::Session;
use arena_types::{SessionKey, SpawnPoint};
use tracing::debug;

/// Prepares a freshly created session before anyone can join.
///
/// After `seed` returns, the session's spawn pool must not be empty; the
/// registry refuses to open sessions nobody could join.
pub trait MutatorPipeline: Send + Sync + 'static {
    fn seed(&self, session: &mut Session);
}

/// Seeds spawn points from a fixed list per key, falling back to a
/// default list for unknown keys.
#[derive(Debug, Clone, Default)]
pub struct SpawnListPipeline {
    by_key: HashMap<SessionKey, Vec<SpawnPoint>>,
    fallback: Vec<SpawnPoint>,
}

impl SpawnListPipeline {
    pub fn new(fallback: Vec<SpawnPoint>) -> Self {
        Self {
            by_key: HashMap::new(),
            fallback,
        }
    }

    /// `count` spawns on a ring of `radius` blocks around the origin at
    /// height `y`, as a default layout.
    pub fn ring(count: usize, radius: f64, y: i32) -> Self {
        let points = (0..count)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / count.max(1) as f64;
                SpawnPoint::on_block(
                    (radius * angle.cos()).round() as i32,
                    y,
                    (radius * angle.sin()).round() as i32,
                )
            })
            .collect();
        Self::new(points)
    }

    /// Uses `points` for sessions created under `key`.
    pub fn with_spawns(mut self, key: impl Into<SessionKey>, points: Vec<SpawnPoint>) -> Self {
        self.by_key.insert(key.into(), points);
        self
    }
}

impl MutatorPipeline for SpawnListPipeline {
    fn seed(&self, session: &mut Session) {
        let points = self.by_key.get(session.key()).unwrap_or(&self.fallback);
        debug!(key = %session.key(), spawns = points.len(), "seeding spawn points");
        session.spawns_mut().seed(points.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arena_session::SessionType;

    use super::*;

    #[test]
    fn test_seed_uses_key_specific_list() {
        let pipeline = SpawnListPipeline::ring(4, 10.0, 64)
            .with_spawns("royale:duel", vec![SpawnPoint::on_block(0, 70, 0)]);

        let mut duel = Session::new(SessionKey::new("royale:duel"), Arc::new(SessionType::default()));
        pipeline.seed(&mut duel);
        assert_eq!(duel.spawns().total(), 1);

        let mut other = Session::new(SessionKey::new("royale:other"), Arc::new(SessionType::default()));
        pipeline.seed(&mut other);
        assert_eq!(other.spawns().total(), 4);
    }

    #[test]
    fn test_ring_points_are_distinct() {
        let pipeline = SpawnListPipeline::ring(6, 12.0, 64);
        let mut session = Session::new(SessionKey::new("royale:ring"), Arc::new(SessionType::default()));
        pipeline.seed(&mut session);

        let mut spawns = session.spawns().clone();
        let points: Vec<_> = (0..6).map(|i| spawns.assign(arena_types::PlayerId(i)).unwrap()).collect();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
