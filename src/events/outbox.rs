//! Transactional outbox.
//!
//! `enqueue` runs inside the transaction that writes the originating state
//! change, so the change and its announcement commit or roll back together.
//! The remaining functions are the dispatcher's and the admin surface's view
//! of the queue.

use chrono::{DateTime, Duration, TimeZone, Utc};
use diesel::prelude::*;
use rand::Rng;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::OutboxStatus;
use crate::models::{NewOutboxEvent, OutboxEvent};
use crate::schema::outbox_events;

use super::types::{ClaimEventData, EventEnvelope, EventName};

/// Base delay applied when an operator requeues a parked event, jittered
/// ±10% to avoid herd effects.
pub const REQUEUE_DELAY_SECS: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct OutboxService;

impl OutboxService {
    /// Writes one `pending` event row in the caller's transaction and
    /// returns it. The envelope (including the generated `event_id`) is
    /// stored as the payload; the dispatcher posts it verbatim.
    #[instrument(skip(conn, data), fields(event = %name, aggregate_id = %aggregate_id))]
    pub fn enqueue(
        conn: &mut PgConnection,
        name: EventName,
        target: &str,
        aggregate_id: Uuid,
        data: ClaimEventData,
    ) -> Result<OutboxEvent, diesel::result::Error> {
        let event_id = new_event_id(aggregate_id);
        let envelope = EventEnvelope::new(name, event_id.clone(), data);
        let payload = serde_json::to_value(&envelope)
            .map_err(|e| diesel::result::Error::SerializationError(Box::new(e)))?;

        let row = NewOutboxEvent {
            event_id,
            event_name: name.as_str().to_string(),
            payload,
            target: target.to_string(),
            status: OutboxStatus::Pending.as_str().to_string(),
            next_attempt_at: Utc::now(),
        };

        let event = diesel::insert_into(outbox_events::table)
            .values(&row)
            .returning(OutboxEvent::as_returning())
            .get_result(conn)?;

        debug!(event_id = %event.event_id, "Event written to outbox");
        Ok(event)
    }

    /// Claims a batch of deliverable events. The selection and the lease
    /// bump happen in one transaction with `FOR UPDATE SKIP LOCKED`, so
    /// concurrent dispatcher instances keep double delivery bounded: a
    /// claimed row is invisible to other workers until its lease elapses.
    #[instrument(skip(conn))]
    pub fn claim_batch(
        conn: &mut PgConnection,
        batch_size: i64,
        lease: Duration,
    ) -> Result<Vec<OutboxEvent>, diesel::result::Error> {
        conn.transaction(|conn| {
            let now = Utc::now();

            let batch: Vec<OutboxEvent> = outbox_events::table
                .filter(outbox_events::status.eq_any(vec![
                    OutboxStatus::Pending.as_str(),
                    OutboxStatus::Failed.as_str(),
                ]))
                .filter(outbox_events::next_attempt_at.le(now))
                .order(outbox_events::created_at.asc())
                .limit(batch_size)
                .for_update()
                .skip_locked()
                .select(OutboxEvent::as_select())
                .load(conn)?;

            if batch.is_empty() {
                return Ok(batch);
            }

            let ids: Vec<i64> = batch.iter().map(|e| e.id).collect();
            diesel::update(outbox_events::table.filter(outbox_events::id.eq_any(&ids)))
                .set((
                    outbox_events::next_attempt_at.eq(now + lease),
                    outbox_events::updated_at.eq(now),
                ))
                .execute(conn)?;

            Ok(batch)
        })
    }

    #[instrument(skip(conn))]
    pub fn mark_sent(conn: &mut PgConnection, id: i64) -> Result<(), diesel::result::Error> {
        diesel::update(outbox_events::table.find(id))
            .set((
                outbox_events::status.eq(OutboxStatus::Sent.as_str()),
                outbox_events::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

        debug!(outbox_id = id, "Event marked as sent");
        Ok(())
    }

    /// Schedules the next redelivery after a retryable failure.
    #[instrument(skip(conn, last_error))]
    pub fn schedule_retry(
        conn: &mut PgConnection,
        id: i64,
        retry_count: i32,
        next_attempt_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(outbox_events::table.find(id))
            .set((
                outbox_events::status.eq(OutboxStatus::Pending.as_str()),
                outbox_events::retry_count.eq(retry_count),
                outbox_events::next_attempt_at.eq(next_attempt_at),
                outbox_events::last_error.eq(last_error),
                outbox_events::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Parks an event. Parked rows keep satisfying the status predicate but
    /// their attempt time is pushed past any horizon, so only an operator
    /// requeue brings them back.
    #[instrument(skip(conn, last_error))]
    pub fn park(
        conn: &mut PgConnection,
        id: i64,
        retry_count: i32,
        last_error: &str,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(outbox_events::table.find(id))
            .set((
                outbox_events::status.eq(OutboxStatus::Failed.as_str()),
                outbox_events::retry_count.eq(retry_count),
                outbox_events::next_attempt_at.eq(parked_until()),
                outbox_events::last_error.eq(last_error),
                outbox_events::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

        debug!(outbox_id = id, retry_count, "Event parked");
        Ok(())
    }

    /// Operator requeue of a parked event. Returns `None` when the event
    /// does not exist or is not parked.
    #[instrument(skip(conn))]
    pub fn requeue(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<OutboxEvent>, diesel::result::Error> {
        let now = Utc::now();

        diesel::update(
            outbox_events::table
                .find(id)
                .filter(outbox_events::status.eq(OutboxStatus::Failed.as_str())),
        )
        .set((
            outbox_events::status.eq(OutboxStatus::Pending.as_str()),
            outbox_events::retry_count.eq(0),
            outbox_events::next_attempt_at.eq(now + requeue_delay()),
            outbox_events::updated_at.eq(now),
        ))
        .returning(OutboxEvent::as_returning())
        .get_result(conn)
        .optional()
    }

    pub fn list(
        conn: &mut PgConnection,
        status: Option<OutboxStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OutboxEvent>, diesel::result::Error> {
        let mut query = outbox_events::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(outbox_events::status.eq(status.as_str()));
        }
        query
            .order(outbox_events::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(OutboxEvent::as_select())
            .load(conn)
    }

    pub fn count(
        conn: &mut PgConnection,
        status: Option<OutboxStatus>,
    ) -> Result<i64, diesel::result::Error> {
        let mut query = outbox_events::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(outbox_events::status.eq(status.as_str()));
        }
        query.count().get_result(conn)
    }
}

/// `<aggregate>-<unix millis>-<random hex>`; unique across producers.
fn new_event_id(aggregate_id: Uuid) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!(
        "{}-{}-{:08x}",
        aggregate_id,
        Utc::now().timestamp_millis(),
        suffix
    )
}

fn requeue_delay() -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(-0.1..=0.1);
    Duration::milliseconds((REQUEUE_DELAY_SECS * (1.0 + jitter) * 1000.0) as i64)
}

fn parked_until() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 1, 1, 0, 0, 0)
        .single()
        .expect("valid constant timestamp")
}
