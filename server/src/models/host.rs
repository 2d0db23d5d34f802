use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{EventId, UserId};

/// Creator attribution row; at most one per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventHost {
    pub event_id: EventId,
    pub user_id: UserId,
}
