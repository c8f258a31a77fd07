use async_graphql::{Context, Result, SimpleObject, Subscription, ID};
use chrono::{DateTime, Utc};
use futures_util::Stream;
use infra::models::AuditLogRow;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::permissions::current_actor;
use crate::gql::error::{DomainError, DomainResultExt};
use crate::gql::types::Role;
use infra::repos::ActorRole;

const CHANNEL_CAPACITY: usize = 100;

/// Routing payload handed to the notification dispatcher. Derived from a committed audit entry.
#[derive(SimpleObject, Clone, Debug)]
pub struct ClubEvent {
    pub entity_type: String,
    pub entity_id: ID,
    pub action_type: String,
    pub club_id: Option<ID>,
    pub actor_id: ID,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

impl From<&AuditLogRow> for ClubEvent {
    fn from(row: &AuditLogRow) -> Self {
        Self {
            entity_type: row.entity_type.clone(),
            entity_id: row.entity_id.into(),
            action_type: row.action_type.clone(),
            club_id: row.club_id.map(Into::into),
            actor_id: row.actor_id.into(),
            actor_role: row.actor_role.into(),
            occurred_at: row.occurred_at,
        }
    }
}

/// Per-club event channels
struct ClubChannels {
    clubs: HashMap<Uuid, broadcast::Sender<ClubEvent>>,
}

impl ClubChannels {
    fn new() -> Self {
        Self {
            clubs: HashMap::new(),
        }
    }

    fn get_or_create_club(&mut self, club_id: Uuid) -> &broadcast::Sender<ClubEvent> {
        self.clubs
            .entry(club_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
    }
}

static CHANNELS: Lazy<Arc<Mutex<ClubChannels>>> =
    Lazy::new(|| Arc::new(Mutex::new(ClubChannels::new())));

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Stream of committed changes in a club (coaches of that club and administrators)
    async fn club_events(
        &self,
        ctx: &Context<'_>,
        club_id: Uuid,
    ) -> Result<impl Stream<Item = Result<ClubEvent, BroadcastStreamRecvError>>> {
        let actor = current_actor(ctx).await.extend_err()?;
        if actor.role == ActorRole::Member {
            return Err(DomainError::Forbidden).extend_err();
        }
        authorize(&actor, &Resource::Club { club_id }, Action::Read).extend_err()?;

        let receiver = {
            let mut channels = CHANNELS.lock();
            channels.get_or_create_club(club_id).subscribe()
        };

        Ok(BroadcastStream::new(receiver))
    }
}

/// Publish a committed audit entry to its club's channel.
pub fn publish_club_event(entry: &AuditLogRow) {
    let Some(club_id) = entry.club_id else {
        return;
    };

    let event = ClubEvent::from(entry);
    let mut channels = CHANNELS.lock();
    // No subscribers is not an error
    let _ = channels.get_or_create_club(club_id).send(event);
}

/// Subscribe without going through GraphQL. Used by in-process consumers and tests.
pub fn subscribe_club(club_id: Uuid) -> broadcast::Receiver<ClubEvent> {
    let mut channels = CHANNELS.lock();
    channels.get_or_create_club(club_id).subscribe()
}
