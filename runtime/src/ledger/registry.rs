//! Event registry operations.

use super::EventLedger;
use crate::metrics::LedgerMetrics;
use campus_ledger_core::store::Scope;
use campus_ledger_core::{
    Capacity, CollegeId, Event, EventId, EventType, LedgerError, NewEvent, Principal, Result,
};
use std::time::Instant;

/// Caller input for [`EventLedger::create_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDraft {
    /// Title; trimmed, must not be blank
    pub title: String,
    /// Kind of event
    pub event_type: EventType,
    /// Registration ceiling, [`Capacity::DEFAULT`] when omitted
    pub capacity: Option<Capacity>,
    /// Owning college, the lowest-id college when omitted
    pub college_id: Option<CollegeId>,
}

impl EventLedger {
    /// Create an open event with zeroed counters. Admin only.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for a non-admin
    /// - `InvalidArgument` for a blank or overlong title
    /// - `NotFound` for an unknown college, or when no college exists to
    ///   default to
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_event(&self, principal: &Principal, draft: EventDraft) -> Result<Event> {
        principal.require_admin()?;

        let college_id = match draft.college_id {
            Some(id) => id,
            None => self.default_college().await?,
        };
        let new_event = NewEvent::new(
            &draft.title,
            draft.event_type,
            draft.capacity.unwrap_or(Capacity::DEFAULT),
            college_id,
        )?;

        let started = Instant::now();
        let event = self.store.insert_event(new_event, self.clock.now()).await?;
        LedgerMetrics::record_duration("create_event", started.elapsed());
        LedgerMetrics::record_event_created();

        tracing::info!(
            event_id = %event.id,
            college_id = %event.college_id,
            capacity = %event.capacity,
            "Event created"
        );
        Ok(event)
    }

    /// Events in scope ordered by id, cancelled ones included.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub async fn list_events(&self, scope: Scope) -> Result<Vec<Event>> {
        self.read("list_events", || self.store.list_events(scope)).await
    }

    /// Look up one event with its live counters.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event> {
        self.read("get_event", || self.store.get_event(event_id))
            .await?
            .ok_or_else(|| LedgerError::not_found("event", event_id))
    }

    /// Cancel an event. Admin only; counts and records are left untouched.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for a non-admin
    /// - `NotFound` for an unknown id
    /// - `AlreadyCancelled` on a repeat call
    #[tracing::instrument(skip(self))]
    pub async fn cancel_event(&self, principal: &Principal, event_id: EventId) -> Result<Event> {
        principal.require_admin()?;

        let event = self.store.cancel_event(event_id).await?;
        LedgerMetrics::record_event_cancelled();
        tracing::info!(
            event_id = %event.id,
            registrations = event.registration_count,
            "Event cancelled"
        );
        Ok(event)
    }

    async fn default_college(&self) -> Result<CollegeId> {
        self.read("list_colleges", || self.store.list_colleges())
            .await?
            .first()
            .map(|college| college.id)
            .ok_or_else(|| LedgerError::not_found("college", "default"))
    }
}
