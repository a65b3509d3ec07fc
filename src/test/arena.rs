use crate::sim::{Event, EventArena, EventKind, SimError, SimTime};
use crate::station::StationId;

fn ev(name: &str) -> Event {
    Event::new(name, EventKind::Arrival, SimTime::ZERO, SimTime(1.0), 0.0, StationId(0))
}

#[test]
fn released_handle_becomes_stale() {
    let mut arena = EventArena::default();
    let h = arena.insert(ev("a"));
    assert_eq!(arena.get(h).map(|e| e.name.as_str()), Some("a"));

    let out = arena.remove(h).expect("first release");
    assert_eq!(out.name, "a");
    assert!(!arena.contains(h));
    assert_eq!(arena.remove(h), Err(SimError::StaleHandle(h)));
}

#[test]
fn reused_slot_does_not_alias_old_handle() {
    let mut arena = EventArena::default();
    let old = arena.insert(ev("old"));
    arena.remove(old).expect("release");
    let new = arena.insert(ev("new"));

    assert!(arena.get(old).is_none());
    assert_eq!(arena.get(new).map(|e| e.name.as_str()), Some("new"));
    assert_ne!(old, new);
}

#[test]
fn counters_track_construction_and_destruction() {
    let mut arena = EventArena::default();
    let handles: Vec<_> = (0..5).map(|i| arena.insert(ev(&format!("e{i}")))).collect();
    for h in &handles[..3] {
        arena.remove(*h).expect("release");
    }
    assert_eq!(arena.constructed(), 5);
    assert_eq!(arena.destroyed(), 3);
    assert_eq!(arena.live(), 2);

    assert_eq!(arena.purge(), 2);
    assert_eq!(arena.live(), 0);
    assert_eq!(arena.constructed(), 0);
    assert!(arena.get(handles[4]).is_none());
}
