use owned_handles::{make_shared, Shared, Weak};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct DropCount(Arc<AtomicUsize>);

impl Drop for DropCount {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// Model a random sequence of handle operations on one Shared family.
//
// Invariants exercised after every step:
// - strong_count equals the number of live non-empty Shared handles.
// - weak_count equals the number of live Weak handles.
// - the resource is destroyed exactly once, exactly when the last strong
//   handle goes away, and lock() fails from then on, permanently.
proptest! {
    #[test]
    fn prop_shared_family_counts(
        ops in proptest::collection::vec((0u8..=6u8, 0usize..64usize), 1..200)
    ) {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut strong: Vec<Shared<DropCount>> = vec![make_shared(DropCount(drops.clone()))];
        let mut weak: Vec<Weak<DropCount>> = Vec::new();
        let mut expired = false;

        for (op, raw) in ops {
            match op {
                // Copy a strong handle
                0 => {
                    if !strong.is_empty() {
                        let c = strong[raw % strong.len()].clone();
                        strong.push(c);
                    }
                }
                // Drop a strong handle
                1 => {
                    if !strong.is_empty() {
                        let i = raw % strong.len();
                        drop(strong.swap_remove(i));
                    }
                }
                // Move out of a strong handle, keeping the empty source around briefly
                2 => {
                    if !strong.is_empty() {
                        let i = raw % strong.len();
                        let moved = strong[i].take();
                        prop_assert!(strong[i].is_empty());
                        strong[i] = moved;
                    }
                }
                // Weaken
                3 => {
                    if !strong.is_empty() {
                        let w = strong[raw % strong.len()].weaken();
                        weak.push(w);
                    }
                }
                // Clone a weak handle
                4 => {
                    if !weak.is_empty() {
                        let w = weak[raw % weak.len()].clone();
                        weak.push(w);
                    }
                }
                // Drop a weak handle
                5 => {
                    if !weak.is_empty() {
                        let i = raw % weak.len();
                        drop(weak.swap_remove(i));
                    }
                }
                // Lock a weak handle
                6 => {
                    if !weak.is_empty() {
                        match weak[raw % weak.len()].lock() {
                            Some(s) => {
                                prop_assert!(!expired);
                                strong.push(s);
                            }
                            None => prop_assert!(expired),
                        }
                    }
                }
                _ => unreachable!(),
            }

            if strong.is_empty() {
                expired = true;
            }
            let destroyed = drops.load(Ordering::SeqCst);
            prop_assert_eq!(destroyed, usize::from(expired));
            if let Some(s) = strong.first() {
                prop_assert_eq!(s.strong_count(), strong.len());
                prop_assert_eq!(s.weak_count(), weak.len());
            }
            if let Some(w) = weak.first() {
                prop_assert_eq!(w.strong_count(), strong.len());
                prop_assert_eq!(w.weak_count(), weak.len());
                prop_assert_eq!(w.expired(), expired);
            }
        }

        drop(strong);
        drop(weak);
        prop_assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
