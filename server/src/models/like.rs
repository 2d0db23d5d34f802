use serde::{Deserialize, Serialize};

use super::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LikeState {
    NotLiked,
    Liked,
}

/// Result of a like transition with a fresh snapshot of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub state: LikeState,
    pub likes: i64,
    pub event: Event,
}
