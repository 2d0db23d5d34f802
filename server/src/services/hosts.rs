use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{EventId, UserId};
use crate::repositories::HostRepository;
use crate::utils::{AppError, AppResult};

/// Who created which event.
#[derive(Clone)]
pub struct HostRegistry {
    hosts: Arc<dyn HostRepository>,
}

impl HostRegistry {
    pub fn new(hosts: Arc<dyn HostRepository>) -> Self {
        Self { hosts }
    }

    /// Record `user_id` as host of `event_id`.
    ///
    /// Repeating the call for the same pair is a no-op; attributing an
    /// already hosted event to someone else is a consistency fault.
    pub async fn attribute(&self, event_id: EventId, user_id: UserId) -> AppResult<()> {
        let stored = self.hosts.attribute(event_id, user_id).await?;
        if stored != user_id {
            return Err(AppError::InternalConsistency(format!(
                "event {} is already hosted by user {}",
                event_id, stored
            )));
        }
        info!(event_id, user_id, "Host attributed");
        Ok(())
    }

    pub async fn find_events_hosted_by(&self, user_id: UserId) -> AppResult<Vec<EventId>> {
        self.hosts.events_hosted_by(user_id).await
    }

    pub async fn find_host(&self, event_id: EventId) -> AppResult<UserId> {
        match self.hosts.hosts_of(event_id).await?.as_slice() {
            [host] => Ok(*host),
            [] => Err(AppError::InternalConsistency(format!(
                "event {} has no host",
                event_id
            ))),
            many => Err(AppError::InternalConsistency(format!(
                "event {} has {} hosts",
                event_id,
                many.len()
            ))),
        }
    }

    /// Hosts for a batch of events. Events without a host are absent from the map.
    pub async fn find_hosts(&self, event_ids: &[EventId]) -> AppResult<HashMap<EventId, UserId>> {
        let mut hosts = HashMap::with_capacity(event_ids.len());
        for row in self.hosts.hosts_for(event_ids).await? {
            if hosts.insert(row.event_id, row.user_id).is_some() {
                return Err(AppError::InternalConsistency(format!(
                    "event {} has more than one host",
                    row.event_id
                )));
            }
        }
        Ok(hosts)
    }

    /// Events left without a host, for operator repair through [`Self::attribute`].
    pub async fn orphaned_events(&self) -> AppResult<Vec<EventId>> {
        let orphans = self.hosts.orphaned_events().await?;
        if !orphans.is_empty() {
            warn!(count = orphans.len(), event_ids = ?orphans, "Events without a host");
        }
        Ok(orphans)
    }
}
