use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delimiter between the stage and partition segments of a drop-target
/// group key (e.g. `"In Progress||Backend"`).
pub const GROUP_DELIMITER: &str = "||";

/// Label the board renders for cards with no lane / no responsible party.
/// Dropping into this group clears the partition field.
pub const UNASSIGNED: &str = "Unassigned";

/// A card as the reorder reducer and the persistence layer see it.
///
/// `position` is only meaningful relative to other cards sharing the same
/// stage; it is renumbered from 1 on every reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    pub position: i32,
}

/// Which secondary grouping axis the board is currently displaying.
///
/// The partition segment of a group key is interpreted against this axis;
/// the *other* axis is never touched by a drop (cross-view isolation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Plain columns, no partitioning.
    Stage,
    /// Stage columns split by lane.
    Lane,
    /// Stage columns split by responsible party.
    Responsible,
}

/// A drag-end event as reported by the board client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropEvent {
    /// The card that was dragged.
    pub card_id: Uuid,
    /// Composite target group key: `stage` or `stage||partition`.
    pub group_key: String,
    /// Requested index within the visible target group. Clamped, never
    /// rejected.
    pub index: usize,
    pub view: ViewMode,
}
