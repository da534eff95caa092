//! Process-lifetime mapping between opaque upstream identifiers and the
//! dense integer identifiers feature-query callers require.
//!
//! The registry is owned by the hosting application and shared by reference;
//! it only ever grows.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

#[derive(Debug, Default)]
struct State {
    by_opaque: HashMap<String, u64>,
    /// Opaque ids indexed by `object_id - 1`.
    by_object_id: Vec<String>,
}

impl State {
    fn assign(&mut self, opaque_id: &str) -> u64 {
        if let Some(object_id) = self.by_opaque.get(opaque_id) {
            return *object_id;
        }
        self.by_object_id.push(opaque_id.to_owned());
        let object_id = u64::try_from(self.by_object_id.len()).unwrap_or(u64::MAX);
        self.by_opaque.insert(opaque_id.to_owned(), object_id);
        object_id
    }
}

/// Bidirectional opaque-id ⇄ integer-id registry.
///
/// Integers start at 1 and are handed out in first-sighting order. The
/// check-then-insert sequence runs under one lock, so concurrent first
/// sightings of different ids never share an integer and concurrent sightings
/// of the same id agree.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    state: Mutex<State>,
}

impl IdentityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the integer for `opaque_id`, allocating the next one on first
    /// sighting.
    ///
    /// # Examples
    ///
    /// ```
    /// use brewery_query::identity::IdentityRegistry;
    ///
    /// let registry = IdentityRegistry::new();
    /// assert_eq!(registry.assign("a"), 1);
    /// assert_eq!(registry.assign("b"), 2);
    /// assert_eq!(registry.assign("a"), 1);
    /// ```
    #[must_use]
    pub fn assign(&self, opaque_id: &str) -> u64 {
        self.lock().assign(opaque_id)
    }

    /// Assign every id in order under a single lock acquisition.
    #[must_use]
    pub fn assign_all<'a, I>(&self, opaque_ids: I) -> Vec<u64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = self.lock();
        opaque_ids
            .into_iter()
            .map(|opaque_id| state.assign(opaque_id))
            .collect()
    }

    /// Opaque id previously assigned `object_id`, if any.
    #[must_use]
    pub fn resolve(&self, object_id: u64) -> Option<String> {
        let index = usize::try_from(object_id.checked_sub(1)?).ok()?;
        let resolved = self.lock().by_object_id.get(index).cloned();
        if resolved.is_none() {
            debug!(object_id, "object id has no known opaque mapping");
        }
        resolved
    }

    /// Number of ids assigned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().by_object_id.len()
    }

    /// Whether nothing has been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    //! Allocation order, idempotence and concurrent first sightings.

    use std::sync::Arc;
    use std::thread;

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> IdentityRegistry {
        IdentityRegistry::new()
    }

    #[rstest]
    fn first_sightings_are_numbered_in_order(registry: IdentityRegistry) {
        assert!(registry.is_empty());
        let ids: Vec<u64> = ["A", "B", "C", "B", "A", "C", "A"]
            .into_iter()
            .map(|opaque| registry.assign(opaque))
            .collect();
        assert_eq!(ids, [1, 2, 3, 2, 1, 3, 1]);
        assert_eq!(registry.len(), 3);
    }

    #[rstest]
    fn assign_all_matches_sequential_assignment(registry: IdentityRegistry) {
        assert_eq!(registry.assign("B"), 1);
        assert_eq!(registry.assign_all(["A", "B", "A", "C"]), [2, 1, 2, 3]);
    }

    #[rstest]
    #[case(1, Some("x"))]
    #[case(2, Some("y"))]
    #[case(0, None)]
    #[case(3, None)]
    #[case(u64::MAX, None)]
    fn resolve_is_the_inverse_of_assign(
        registry: IdentityRegistry,
        #[case] object_id: u64,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(registry.assign_all(["x", "y"]), [1, 2]);
        assert_eq!(registry.resolve(object_id).as_deref(), expected);
    }

    #[test]
    fn concurrent_sightings_never_collide() {
        let registry = Arc::new(IdentityRegistry::new());
        let opaque_ids: Vec<String> = (0..50).map(|n| format!("id-{n}")).collect();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let shared = Arc::clone(&registry);
                let mut ids = opaque_ids.clone();
                ids.rotate_left(worker * 5);
                thread::spawn(move || {
                    ids.iter()
                        .map(|opaque| (opaque.clone(), shared.assign(opaque)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: HashMap<String, u64> = HashMap::new();
        for handle in handles {
            for (opaque, object_id) in handle.join().expect("worker completes") {
                let previous = seen.insert(opaque.clone(), object_id);
                assert!(previous.is_none_or(|earlier| earlier == object_id));
            }
        }

        assert_eq!(registry.len(), 50);
        let mut assigned: Vec<u64> = seen.values().copied().collect();
        assigned.sort_unstable();
        assert_eq!(assigned, (1..=50).collect::<Vec<u64>>());
        for (opaque, object_id) in &seen {
            assert_eq!(registry.resolve(*object_id).as_deref(), Some(opaque.as_str()));
        }
    }
}
