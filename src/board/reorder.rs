//! Drag-and-drop position reindexing.
//!
//! A drop is reduced as `(current list, drop event) -> new list`: the moved
//! card is relocated in the full list and every stage's `position` counter is
//! renumbered from 1 in list order. Persisting the result is one bulk upsert;
//! no other column-wide rewrite is needed.

use std::collections::HashMap;

use crate::models::card::{Card, DropEvent, ViewMode, GROUP_DELIMITER, UNASSIGNED};

/// Target group resolved from a composite group key.
#[derive(Debug, Clone, Copy)]
struct TargetGroup<'a> {
    stage: &'a str,
    /// Partition value on the active view axis, if the key supplied one.
    partition: Option<&'a str>,
}

fn resolve_group<'a>(group_key: &'a str, view: ViewMode) -> TargetGroup<'a> {
    match group_key.split_once(GROUP_DELIMITER) {
        Some((stage, partition)) if view != ViewMode::Stage => TargetGroup {
            stage,
            partition: Some(partition),
        },
        Some((stage, _)) => TargetGroup {
            stage,
            partition: None,
        },
        None => TargetGroup {
            stage: group_key,
            partition: None,
        },
    }
}

/// Group membership: same stage, and on the active axis the same partition
/// value. Cards with no partition value belong to the [`UNASSIGNED`] group.
fn in_group(card: &Card, group: TargetGroup<'_>, view: ViewMode) -> bool {
    if card.stage != group.stage {
        return false;
    }
    let Some(partition) = group.partition else {
        return true;
    };
    let value = match view {
        ViewMode::Stage => return true,
        ViewMode::Lane => card.lane.as_deref(),
        ViewMode::Responsible => card.responsible.as_deref(),
    };
    value.unwrap_or(UNASSIGNED) == partition
}

/// Applies a drop event to the full card list and returns the new list.
///
/// If the dragged card is not present the input is returned untouched; a
/// stale drop is a no-op, not an error. The returned list is renumbered via
/// [`renumber`] and is the exact set of rows to persist.
pub fn apply_drop(mut cards: Vec<Card>, event: &DropEvent) -> Vec<Card> {
    let group = resolve_group(&event.group_key, event.view);

    let Some(at) = cards.iter().position(|c| c.id == event.card_id) else {
        return cards;
    };
    let mut moved = cards.remove(at);

    moved.stage = group.stage.to_string();
    // Only the active view's partition axis is written; the other axis must
    // survive a view switch untouched.
    if let Some(partition) = group.partition {
        let value = (partition != UNASSIGNED).then(|| partition.to_string());
        match event.view {
            ViewMode::Lane => moved.lane = value,
            ViewMode::Responsible => moved.responsible = value,
            ViewMode::Stage => {}
        }
    }

    let group_len = cards
        .iter()
        .filter(|c| in_group(c, group, event.view))
        .count();
    let target = event.index.min(group_len);

    // Walk the full list counting group members; the global insertion point
    // is just before the target-th member, or after the last member when the
    // group is exhausted first.
    let mut seen = 0usize;
    let mut insert_at = None;
    let mut after_last_member = None;
    for (i, card) in cards.iter().enumerate() {
        if in_group(card, group, event.view) {
            if seen == target {
                insert_at = Some(i);
                break;
            }
            seen += 1;
            after_last_member = Some(i + 1);
        }
    }
    let insert_at = insert_at
        .or(after_last_member)
        .unwrap_or(cards.len());

    cards.insert(insert_at, moved);
    renumber(&mut cards);
    cards
}

/// Renumbers `position` sequentially from 1 for every distinct stage, in
/// list order. The counter is scoped per stage only: lanes within one stage
/// share a counter space, with ties broken by list order. Consumers that
/// sort by `(stage, position)` without partition awareness depend on this.
pub fn renumber(cards: &mut [Card]) {
    let mut counters: HashMap<String, i32> = HashMap::new();
    for card in cards.iter_mut() {
        let n = counters.entry(card.stage.clone()).or_insert(0);
        *n += 1;
        card.position = *n;
    }
}
