//! Integration tests for drag-and-drop reordering.
//!
//! These tests verify:
//! 1. Multi-step drag sequences keep every stage's positions dense (1..n)
//! 2. Partition groups stay isolated across moves and view switches
//! 3. The drop-event wire shape matches what the board client sends
//!
//! All tests run against the pure reducer — no database required.

use taskdeck::board::reorder::{apply_drop, renumber};
use taskdeck::models::card::{Card, DropEvent, ViewMode};
use uuid::Uuid;

fn card(id: u128, stage: &str, lane: Option<&str>, responsible: Option<&str>) -> Card {
    Card {
        id: Uuid::from_u128(id),
        stage: stage.to_string(),
        lane: lane.map(String::from),
        responsible: responsible.map(String::from),
        position: 0,
    }
}

fn drop(id: u128, key: &str, index: usize, view: ViewMode) -> DropEvent {
    DropEvent {
        card_id: Uuid::from_u128(id),
        group_key: key.to_string(),
        index,
        view,
    }
}

fn board() -> Vec<Card> {
    let mut cards = vec![
        card(1, "Todo", Some("backend"), Some("alice")),
        card(2, "Todo", Some("frontend"), Some("bob")),
        card(3, "Todo", None, None),
        card(4, "Doing", Some("backend"), Some("alice")),
        card(5, "Doing", None, Some("carol")),
        card(6, "Done", Some("frontend"), None),
    ];
    renumber(&mut cards);
    cards
}

fn stage_positions(cards: &[Card], stage: &str) -> Vec<i32> {
    cards
        .iter()
        .filter(|c| c.stage == stage)
        .map(|c| c.position)
        .collect()
}

#[test]
fn positions_stay_dense_across_a_drag_sequence() {
    let mut cards = board();
    let moves = [
        drop(1, "Doing", 0, ViewMode::Stage),
        drop(6, "Todo", 1, ViewMode::Stage),
        drop(4, "Done", 0, ViewMode::Stage),
        drop(2, "Doing||backend", 0, ViewMode::Lane),
    ];
    for event in &moves {
        cards = apply_drop(cards, event);
        for stage in ["Todo", "Doing", "Done"] {
            let positions = stage_positions(&cards, stage);
            let expected: Vec<i32> = (1..=positions.len() as i32).collect();
            assert_eq!(positions, expected, "stage {stage} after {event:?}");
        }
    }
    assert_eq!(cards.len(), 6, "no card may appear or vanish");
}

#[test]
fn repeated_identical_drop_converges() {
    let cards = board();
    let event = drop(2, "Todo||frontend", 0, ViewMode::Lane);
    let once = apply_drop(cards, &event);
    let twice = apply_drop(once.clone(), &event);
    assert_eq!(once, twice);
}

#[test]
fn responsible_view_moves_leave_lanes_intact() {
    let cards = board();
    let before: Vec<Option<String>> = {
        let mut v: Vec<_> = cards.iter().map(|c| (c.id, c.lane.clone())).collect();
        v.sort_by_key(|(id, _)| *id);
        v.into_iter().map(|(_, lane)| lane).collect()
    };

    let out = apply_drop(cards, &drop(5, "Todo||alice", 0, ViewMode::Responsible));

    let after: Vec<Option<String>> = {
        let mut v: Vec<_> = out.iter().map(|c| (c.id, c.lane.clone())).collect();
        v.sort_by_key(|(id, _)| *id);
        v.into_iter().map(|(_, lane)| lane).collect()
    };
    assert_eq!(before, after, "lane axis must survive a responsible-view drop");

    let moved = out.iter().find(|c| c.id == Uuid::from_u128(5)).unwrap();
    assert_eq!(moved.responsible.as_deref(), Some("alice"));
    assert_eq!(moved.stage, "Todo");
}

#[test]
fn moving_between_partitions_keeps_other_partition_order() {
    let cards = board();
    let frontend_before: Vec<Uuid> = cards
        .iter()
        .filter(|c| c.stage == "Todo" && c.lane.as_deref() == Some("frontend"))
        .map(|c| c.id)
        .collect();

    // Move the backend card to the top of the unassigned lane.
    let out = apply_drop(cards, &drop(1, "Todo||Unassigned", 0, ViewMode::Lane));

    let frontend_after: Vec<Uuid> = out
        .iter()
        .filter(|c| c.stage == "Todo" && c.lane.as_deref() == Some("frontend"))
        .map(|c| c.id)
        .collect();
    assert_eq!(frontend_before, frontend_after);

    let moved = out.iter().find(|c| c.id == Uuid::from_u128(1)).unwrap();
    assert_eq!(moved.lane, None, "Unassigned drop clears the lane");
}

#[test]
fn oversized_index_lands_at_group_end() {
    let out = apply_drop(board(), &drop(6, "Todo", 999, ViewMode::Stage));
    let todo_ids: Vec<u128> = out
        .iter()
        .filter(|c| c.stage == "Todo")
        .map(|c| c.id.as_u128())
        .collect();
    assert_eq!(*todo_ids.last().unwrap(), 6);
    assert_eq!(stage_positions(&out, "Todo"), vec![1, 2, 3, 4]);
}

#[test]
fn drop_event_deserializes_from_the_client_wire_shape() {
    let json = r#"{
        "card_id": "00000000-0000-0000-0000-000000000002",
        "group_key": "Doing||backend",
        "index": 1,
        "view": "lane"
    }"#;
    let event: DropEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.card_id, Uuid::from_u128(2));
    assert_eq!(event.group_key, "Doing||backend");
    assert_eq!(event.index, 1);
    assert_eq!(event.view, ViewMode::Lane);
}

#[test]
fn card_serialization_skips_empty_partitions() {
    let c = card(1, "Todo", None, None);
    let json = serde_json::to_value(&c).unwrap();
    assert!(json.get("lane").is_none());
    assert!(json.get("responsible").is_none());

    let c = card(2, "Todo", Some("backend"), None);
    let json = serde_json::to_value(&c).unwrap();
    assert_eq!(json["lane"], "backend");
}
