use owned_handles::{make_shared, HandleError, Shared, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn lock_succeeds_while_owned() {
    let s = make_shared(String::from("alive"));
    let w = s.weaken();
    let again = w.lock().expect("still owned");
    assert_eq!(again.as_str(), "alive");
    assert_eq!(s.strong_count(), 2);
    assert!(again.ptr_eq(&s));
}

#[test]
fn expiry_is_permanent() {
    let s = make_shared(1u32);
    let w = s.weaken();
    drop(s);
    for _ in 0..3 {
        assert!(w.lock().is_none());
        assert!(w.upgrade().is_none());
        assert_eq!(w.try_lock().err(), Some(HandleError::UpgradeExpired));
    }
    assert!(w.expired());
}

#[test]
fn weak_clones_count_and_share_block() {
    let s = make_shared(0u8);
    let w1 = s.weaken();
    let w2 = w1.clone();
    let w3 = Weak::from(&s);
    assert_eq!(s.weak_count(), 3);
    assert!(w1.ptr_eq(&w2));
    assert!(w1.ptr_eq(&w3));
    drop(w2);
    assert_eq!(s.weak_count(), 2);
    assert_eq!(s.strong_count(), 1);
}

#[test]
fn empty_weak_never_upgrades() {
    let w: Weak<u32> = Weak::new();
    assert!(w.expired());
    assert!(w.lock().is_none());
    assert_eq!(w.strong_count(), 0);
    assert_eq!(w.weak_count(), 0);
    assert!(w.ptr_eq(&Weak::default()));

    let empty: Shared<u32> = Shared::default();
    assert!(empty.weaken().expired());
}

#[test]
fn weak_does_not_keep_resource_alive() {
    let drops = Arc::new(AtomicUsize::new(0));
    struct DropCount(Arc<AtomicUsize>);
    impl Drop for DropCount {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
    let s = make_shared(DropCount(drops.clone()));
    let weaks: Vec<_> = (0..4).map(|_| s.weaken()).collect();
    drop(s);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(weaks.iter().all(Weak::expired));
}

/// A parent owns its children; children point back with weak handles, so
/// dropping the parent tears the whole tree down.
#[test]
fn weak_back_references_break_cycles() {
    let drops = Arc::new(AtomicUsize::new(0));

    struct Node {
        parent: Mutex<Weak<Node>>,
        children: Mutex<Vec<Shared<Node>>>,
        drops: Arc<AtomicUsize>,
    }
    impl Drop for Node {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }
    let node = |drops: &Arc<AtomicUsize>| Node {
        parent: Mutex::new(Weak::new()),
        children: Mutex::new(Vec::new()),
        drops: drops.clone(),
    };

    let root = make_shared(node(&drops));
    for _ in 0..3 {
        let child = make_shared(node(&drops));
        *child.parent.lock().unwrap() = root.weaken();
        root.children.lock().unwrap().push(child);
    }
    let first = root.children.lock().unwrap()[0].clone();
    let parent = first.parent.lock().unwrap().lock().expect("root alive");
    assert!(parent.ptr_eq(&root));
    drop(parent);

    drop(root);
    assert_eq!(drops.load(Ordering::SeqCst), 3);
    assert!(first.parent.lock().unwrap().expired());
    drop(first);
    assert_eq!(drops.load(Ordering::SeqCst), 4);
}

/// A resource that holds a weak handle to its own block is destroyed
/// cleanly; dropping that weak handle during destruction must not free the
/// block underneath the destruction path.
#[test]
fn self_referencing_weak_is_dropped_during_destruction() {
    struct SelfRef {
        me: Mutex<Weak<SelfRef>>,
    }
    let s = make_shared(SelfRef {
        me: Mutex::new(Weak::new()),
    });
    *s.me.lock().unwrap() = s.weaken();
    assert_eq!(s.weak_count(), 1);
    let outside = s.weaken();
    drop(s);
    assert!(outside.expired());
    assert_eq!(outside.weak_count(), 1);
}

/// While the resource is being destroyed, `weak_count` reports only real weak
/// handles, not the unit kept internally for the strong ones.
#[test]
fn weak_count_during_destruction_excludes_internal_unit() {
    struct Watched {
        outside: Arc<Mutex<Weak<Watched>>>,
        seen: Arc<Mutex<Option<(usize, usize)>>>,
    }
    impl Drop for Watched {
        fn drop(&mut self) {
            let w = self.outside.lock().unwrap();
            *self.seen.lock().unwrap() = Some((w.strong_count(), w.weak_count()));
        }
    }
    let outside = Arc::new(Mutex::new(Weak::new()));
    let seen = Arc::new(Mutex::new(None));
    let s = make_shared(Watched {
        outside: outside.clone(),
        seen: seen.clone(),
    });
    *outside.lock().unwrap() = s.weaken();
    assert_eq!(s.weak_count(), 1);
    drop(s);
    assert_eq!(*seen.lock().unwrap(), Some((0, 1)));
    assert_eq!(outside.lock().unwrap().weak_count(), 1);
}
