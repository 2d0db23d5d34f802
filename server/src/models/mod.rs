pub mod event;
pub mod host;
pub mod like;
pub mod reference;
pub mod user;

pub use event::{EnrichedEvent, EnrichedEventWithHost, Event, EventDraft, NewEvent};
pub use host::EventHost;
pub use like::{LikeOutcome, LikeState};
pub use reference::{Category, Location};
pub use user::{HostProfile, User};

pub type EventId = i32;
pub type UserId = i32;
pub type LocationId = i32;
pub type CategoryId = i32;
