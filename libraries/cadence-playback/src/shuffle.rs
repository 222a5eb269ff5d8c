//! Shuffle and reverse order generation
//!
//! Both generators keep the currently playing track (when given) at index 0,
//! so switching modes mid-track never jumps to an unrelated track.

use cadence_core::{OrderMap, TrackId};
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Randomize `order`
///
/// Fisher-Yates over every entry except `current`, which is placed first.
/// With no current track the whole map is shuffled.
pub fn shuffled(order: &OrderMap, current: Option<TrackId>) -> OrderMap {
    let mut rng = thread_rng();
    match current.filter(|id| order.contains(*id)) {
        Some(current) => {
            let mut rest = order.without(current).into_vec();
            rest.shuffle(&mut rng);
            std::iter::once(current).chain(rest).collect()
        }
        None => {
            let mut ids = order.clone().into_vec();
            ids.shuffle(&mut rng);
            OrderMap::from(ids)
        }
    }
}

/// Reverse `order`
///
/// `current`, when present, is placed first and the remaining entries follow
/// in reverse order.
pub fn reversed(order: &OrderMap, current: Option<TrackId>) -> OrderMap {
    match current.filter(|id| order.contains(*id)) {
        Some(current) => std::iter::once(current)
            .chain(order.without(current).into_vec().into_iter().rev())
            .collect(),
        None => order.as_slice().iter().rev().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sorted(map: &OrderMap) -> Vec<TrackId> {
        let mut ids = map.clone().into_vec();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn reverse_without_current() {
        let map = OrderMap::from(vec![1, 2, 3]);
        assert_eq!(reversed(&map, None).as_slice(), &[3, 2, 1]);
    }

    #[test]
    fn reverse_keeps_current_first() {
        let map = OrderMap::from(vec![1, 2, 3, 4]);
        assert_eq!(reversed(&map, Some(2)).as_slice(), &[2, 4, 3, 1]);
    }

    #[test]
    fn unknown_current_is_ignored() {
        let map = OrderMap::from(vec![1, 2, 3]);
        assert_eq!(reversed(&map, Some(99)).as_slice(), &[3, 2, 1]);
        assert_eq!(sorted(&shuffled(&map, Some(99))), vec![1, 2, 3]);
    }

    #[test]
    fn empty_and_single() {
        assert!(shuffled(&OrderMap::new(), None).is_empty());
        assert_eq!(shuffled(&OrderMap::from(vec![7]), Some(7)).as_slice(), &[7]);
        assert_eq!(reversed(&OrderMap::from(vec![7]), None).as_slice(), &[7]);
    }

    proptest! {
        /// Property: shuffle is a permutation with the current track first
        #[test]
        fn shuffle_is_permutation_with_current_first(
            ids in prop::collection::hash_set(1i64..10_000, 1..60),
            pick in any::<prop::sample::Index>(),
        ) {
            let map: OrderMap = ids.into_iter().collect();
            let current = map.get(pick.index(map.len())).unwrap();

            let out = shuffled(&map, Some(current));
            prop_assert_eq!(out.get(0), Some(current));
            prop_assert_eq!(sorted(&out), sorted(&map));
        }

        /// Property: reverse is a permutation with the current track first
        #[test]
        fn reverse_is_permutation_with_current_first(
            ids in prop::collection::hash_set(1i64..10_000, 1..60),
            pick in any::<prop::sample::Index>(),
        ) {
            let map: OrderMap = ids.into_iter().collect();
            let current = map.get(pick.index(map.len())).unwrap();

            let out = reversed(&map, Some(current));
            prop_assert_eq!(out.get(0), Some(current));
            prop_assert_eq!(sorted(&out), sorted(&map));
        }
    }
}
