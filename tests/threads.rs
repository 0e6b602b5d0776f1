use owned_handles::{make_exclusive, make_shared, Exclusive};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

struct DropCount(Arc<AtomicUsize>);

impl Drop for DropCount {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn concurrent_clone_and_drop_destroys_once() {
    for _ in 0..20 {
        let drops = Arc::new(AtomicUsize::new(0));
        let s = make_shared(DropCount(drops.clone()));
        let barrier = Arc::new(Barrier::new(8));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let mine = s.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..1_000 {
                        let c = mine.clone();
                        drop(c);
                    }
                })
            })
            .collect();
        drop(s);
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}

/// Upgrades racing the final drop either see a live resource or fail; none
/// observes a destroyed one and the resource is destroyed exactly once.
#[test]
fn lock_races_final_drop() {
    for _ in 0..50 {
        let drops = Arc::new(AtomicUsize::new(0));
        let s = make_shared(DropCount(drops.clone()));
        let w = s.weaken();
        let barrier = Arc::new(Barrier::new(5));
        let lockers: Vec<_> = (0..4)
            .map(|_| {
                let w = w.clone();
                let barrier = barrier.clone();
                let drops = drops.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let mut failed_once = false;
                    for _ in 0..200 {
                        match w.lock() {
                            Some(strong) => {
                                assert!(!failed_once, "lock succeeded after expiry");
                                assert_eq!(drops.load(Ordering::SeqCst), 0);
                                drop(strong);
                            }
                            None => failed_once = true,
                        }
                    }
                })
            })
            .collect();
        barrier.wait();
        drop(s);
        for l in lockers {
            l.join().unwrap();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(w.expired());
    }
}

#[test]
fn exclusive_moves_between_threads() {
    let drops = Arc::new(AtomicUsize::new(0));
    let e: Exclusive<DropCount> = make_exclusive(DropCount(drops.clone()));
    thread::spawn(move || drop(e)).join().unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}
