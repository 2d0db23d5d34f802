use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::models::{EnrichedEvent, EnrichedEventWithHost, Event, EventId, HostProfile, User, UserId};
use crate::repositories::UserRepository;
use crate::utils::{AppError, AppResult};

use super::hosts::HostRegistry;
use super::reference::{Descriptions, ReferenceResolver};

/// Joins events with reference names and host profiles for read paths.
///
/// Lookups are batched per result set; output order always follows input order.
#[derive(Clone)]
pub struct EventAggregator {
    references: ReferenceResolver,
    hosts: HostRegistry,
    users: Arc<dyn UserRepository>,
}

impl EventAggregator {
    pub fn new(
        references: ReferenceResolver,
        hosts: HostRegistry,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            references,
            hosts,
            users,
        }
    }

    pub async fn enrich(&self, events: Vec<Event>) -> AppResult<Vec<EnrichedEvent>> {
        let names = self.references.describe_all(&events).await?;
        events
            .into_iter()
            .map(|event| with_names(event, &names))
            .collect()
    }

    /// Like [`Self::enrich`], plus the public profile of each event's host.
    ///
    /// An event without a resolvable host fails the whole call.
    pub async fn enrich_with_hosts(
        &self,
        events: Vec<Event>,
    ) -> AppResult<Vec<EnrichedEventWithHost>> {
        let event_ids: Vec<EventId> = events.iter().map(|e| e.id).collect();
        let (names, hosts) = tokio::try_join!(
            self.references.describe_all(&events),
            self.hosts.find_hosts(&event_ids)
        )?;

        let user_ids: Vec<UserId> = hosts
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let users: HashMap<UserId, User> = self
            .users
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        events
            .into_iter()
            .map(|event| {
                let host_id = *hosts.get(&event.id).ok_or_else(|| {
                    AppError::InternalConsistency(format!("event {} has no host", event.id))
                })?;
                let host = users.get(&host_id).ok_or_else(|| {
                    AppError::InternalConsistency(format!(
                        "host {} of event {} does not exist",
                        host_id, event.id
                    ))
                })?;
                Ok(EnrichedEventWithHost {
                    event: with_names(event, &names)?,
                    user: HostProfile::from(host),
                })
            })
            .collect()
    }
}

fn with_names(event: Event, names: &Descriptions) -> AppResult<EnrichedEvent> {
    let location_name = names.location(event.location_id)?.to_string();
    let category_name = names.category(event.category_id)?.to_string();
    Ok(EnrichedEvent {
        event,
        location_name,
        category_name,
    })
}
