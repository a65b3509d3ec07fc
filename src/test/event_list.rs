use crate::sim::{
    Event, EventArena, EventHandle, EventKind, EventList, ScheduledEvent, SimError, SimTime,
};
use crate::station::StationId;
use std::cmp::Ordering;

fn push(arena: &mut EventArena, list: &mut EventList, name: &str, at: f64) -> EventHandle {
    let h = arena.insert(Event::new(
        name,
        EventKind::Arrival,
        SimTime::ZERO,
        SimTime(at),
        0.0,
        StationId(0),
    ));
    list.insert(h, SimTime(at));
    h
}

fn drain_names(arena: &EventArena, list: &mut EventList) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(item) = list.dequeue() {
        out.push(arena.get(item.handle).expect("live event").name.clone());
    }
    out
}

#[test]
fn dequeue_returns_events_in_time_order() {
    let mut arena = EventArena::default();
    let mut list = EventList::default();
    push(&mut arena, &mut list, "c", 30.0);
    push(&mut arena, &mut list, "a", 10.0);
    push(&mut arena, &mut list, "b", 20.0);
    push(&mut arena, &mut list, "z", 0.5);

    assert_eq!(drain_names(&arena, &mut list), ["z", "a", "b", "c"]);
}

#[test]
fn equal_timestamps_keep_insertion_order() {
    let mut arena = EventArena::default();
    let mut list = EventList::default();
    push(&mut arena, &mut list, "first", 5.0);
    push(&mut arena, &mut list, "early", 1.0);
    push(&mut arena, &mut list, "second", 5.0);
    push(&mut arena, &mut list, "third", 5.0);

    assert_eq!(
        drain_names(&arena, &mut list),
        ["early", "first", "second", "third"]
    );
}

#[test]
fn dequeue_from_empty_list_fails() {
    let mut list = EventList::default();
    assert_eq!(list.dequeue(), Err(SimError::EmptyList));
}

#[test]
fn clear_releases_every_pending_event() {
    let mut arena = EventArena::default();
    let mut list = EventList::default();
    let hs: Vec<_> = (0..4)
        .map(|i| push(&mut arena, &mut list, &format!("e{i}"), i as f64))
        .collect();

    assert_eq!(list.clear(&mut arena), 4);
    assert!(list.is_empty());
    assert!(hs.iter().all(|h| !arena.contains(*h)));
    assert_eq!(arena.constructed(), arena.destroyed());
}

#[test]
fn injected_order_is_respected() {
    fn latest_first(a: &ScheduledEvent, b: &ScheduledEvent) -> Ordering {
        match b.at.cmp(&a.at) {
            Ordering::Equal => a.seq.cmp(&b.seq),
            ord => ord,
        }
    }

    let mut arena = EventArena::default();
    let mut list = EventList::with_order(latest_first);
    push(&mut arena, &mut list, "a", 1.0);
    push(&mut arena, &mut list, "c", 3.0);
    push(&mut arena, &mut list, "b", 2.0);

    assert_eq!(drain_names(&arena, &mut list), ["c", "b", "a"]);
}
