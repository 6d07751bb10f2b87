//! Drives the cyclic container through the public API the way the viewer
//! does: populate, navigate in both directions, dump, drain.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use ringview::ring::{NodeHooks, NodeView, Ring, RingError};
use ringview::scan::PathHooks;

#[test]
fn full_session_over_a_path_ring() {
    let mut ring = Ring::new(PathHooks);
    let entry = ring.create(PathBuf::from("/pics/a.png"));
    ring.append(entry, PathBuf::from("/pics/b.png")).unwrap();
    ring.append(entry, PathBuf::from("/pics/c.png")).unwrap();

    // One length query up front, then pure navigation.
    let count = ring.len(entry);
    assert_eq!(count, 3);

    let mut cur = entry;
    for _ in 0..count {
        cur = ring.next(cur).unwrap();
    }
    assert_eq!(cur, entry);
    for _ in 0..count {
        cur = ring.prev(cur).unwrap();
    }
    assert_eq!(cur, entry);

    let listing = ring.list(entry);
    assert!(listing.contains("a.png"));
    assert!(listing.contains("b.png"));
    assert!(listing.contains("c.png"));

    ring.free_all(entry);
    assert_eq!(ring.len(entry), 0);
    assert_eq!(ring.list(entry), "-> (nil)\n");
    assert_eq!(
        ring.append(entry, PathBuf::from("/pics/d.png")),
        Err(RingError::InvalidArgument)
    );
}

struct CountingHooks {
    disposed: Rc<RefCell<usize>>,
}

impl NodeHooks<PathBuf> for CountingHooks {
    fn matches(&self, a: &PathBuf, b: &PathBuf) -> bool {
        a == b
    }

    fn describe(&self, node: NodeView<'_, PathBuf>) -> String {
        format!("({}) {}", node.id, node.data.display())
    }

    fn dispose(&self, _data: PathBuf) {
        *self.disposed.borrow_mut() += 1;
    }
}

#[test]
fn drain_destroys_every_node_exactly_once() {
    for n in 1..=8usize {
        let disposed = Rc::new(RefCell::new(0));
        let mut ring = Ring::new(CountingHooks {
            disposed: Rc::clone(&disposed),
        });
        let entry = ring.create(PathBuf::from("img0.png"));
        for i in 1..n {
            ring.append(entry, PathBuf::from(format!("img{i}.png")))
                .unwrap();
        }
        assert_eq!(ring.len(entry), n);
        ring.free_all(entry);
        assert_eq!(*disposed.borrow(), n);
    }
}

#[test]
fn removal_by_value_keeps_the_rest_of_the_session_valid() {
    let disposed = Rc::new(RefCell::new(0));
    let mut ring = Ring::new(CountingHooks {
        disposed: Rc::clone(&disposed),
    });
    let entry = ring.create(PathBuf::from("keep.png"));
    ring.append(entry, PathBuf::from("drop.png")).unwrap();
    ring.append(entry, PathBuf::from("also-keep.png")).unwrap();

    let entry = ring
        .remove_first(entry, &PathBuf::from("drop.png"))
        .unwrap()
        .expect("ring still populated");
    assert_eq!(*disposed.borrow(), 1);
    assert_eq!(ring.len(entry), 2);

    // A value that is not present changes nothing.
    let entry = ring
        .remove_first(entry, &PathBuf::from("absent.png"))
        .unwrap()
        .expect("ring still populated");
    assert_eq!(*disposed.borrow(), 1);
    assert_eq!(ring.len(entry), 2);

    ring.free_all(entry);
    assert_eq!(*disposed.borrow(), 3);
}
