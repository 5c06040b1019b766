/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, TrackerStatsError};
use crate::pack::{retention_cutoff, start_of_day, BlockedTrackersPack, Day};
use crate::store::BlockedTrackersStore;

/// Default debounce interval between the last `record` in a burst and the
/// commit it produces (spec §6, overridable for tests).
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

type CommitOutcome = std::result::Result<(), Error>;
type StatsOutcome = std::result::Result<HashMap<String, i64>, Error>;

enum ActorCommand {
    Record {
        company: String,
        reply: oneshot::Sender<()>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Terminate {
        reply: oneshot::Sender<CommitOutcome>,
    },
    FetchSevenDay {
        reply: oneshot::Sender<StatsOutcome>,
    },
    FetchCurrentDay {
        reply: oneshot::Sender<StatsOutcome>,
    },
    ClearStats {
        reply: oneshot::Sender<CommitOutcome>,
    },
    /// Internal: the debounce timer elapsed without being superseded.
    Flush,
}

struct CommitRequest {
    pack: BlockedTrackersPack,
    ack: Option<oneshot::Sender<CommitOutcome>>,
}

enum DbCommand {
    Commit(CommitRequest),
    Sum7Day {
        cutoff: Day,
        reply: oneshot::Sender<StatsOutcome>,
    },
    CountsForDay {
        day: Day,
        reply: oneshot::Sender<StatsOutcome>,
    },
    ClearAll {
        reply: oneshot::Sender<CommitOutcome>,
    },
}

/// The single-writer blocked-tracker stats aggregator (spec §4.5, §5, §6).
///
/// Owns two background tasks: an actor that serializes all mutations of the
/// in-memory pack through one mailbox, and a "database executor" that owns
/// the persistent store and processes commits/reads from a second channel,
/// one at a time, on its own task. No lock is shared between the two; the
/// channel is the only synchronization boundary.
pub struct TrackerAggregator {
    commands: mpsc::UnboundedSender<ActorCommand>,
    updates: broadcast::Sender<()>,
    events: broadcast::Sender<TrackerStatsError>,
}

impl TrackerAggregator {
    pub fn new(store: Arc<dyn BlockedTrackersStore>, debounce: Duration) -> Self {
        Self::with_clock(store, debounce, Arc::new(SystemClock))
    }

    pub fn with_default_debounce(store: Arc<dyn BlockedTrackersStore>) -> Self {
        Self::new(store, DEFAULT_DEBOUNCE)
    }

    /// Used by tests to inject a `TestClock` so day-rollover and retention
    /// behavior can be driven deterministically.
    pub fn with_clock(
        store: Arc<dyn BlockedTrackersStore>,
        debounce: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (db_tx, db_rx) = mpsc::unbounded_channel();
        let (update_tx, _) = broadcast::channel(16);
        let (event_tx, _) = broadcast::channel(16);

        tokio::spawn(run_db_executor(
            store,
            db_rx,
            update_tx.clone(),
            event_tx.clone(),
            clock.clone(),
        ));
        tokio::spawn(run_actor(cmd_rx, cmd_tx.clone(), db_tx, debounce, clock));

        Self {
            commands: cmd_tx,
            updates: update_tx,
            events: event_tx,
        }
    }

    /// A broadcast receiver that gets a unit value after each successful
    /// current-day commit (spec §6, "Update channel").
    pub fn subscribe_updates(&self) -> broadcast::Receiver<()> {
        self.updates.subscribe()
    }

    /// A broadcast receiver that gets every error the database executor
    /// can't report back through a direct reply — i.e. the debounced commit
    /// path, which fires with no caller waiting on it (spec §7, "reported
    /// through an optional event channel").
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerStatsError> {
        self.events.subscribe()
    }

    /// Increments `company`'s counter for today. Returns once the increment
    /// is observable to a subsequent read in the actor (spec §6).
    pub async fn record(&self, company: impl Into<String>) {
        let (reply, recv) = oneshot::channel();
        if self
            .commands
            .send(ActorCommand::Record {
                company: company.into(),
                reply,
            })
            .is_ok()
        {
            let _ = recv.await;
        }
    }

    /// Drops in-memory counts and starts a fresh pack for today, discarding
    /// (not flushing) any pending debounced commit.
    pub async fn reset(&self) {
        let (reply, recv) = oneshot::channel();
        if self.commands.send(ActorCommand::Reset { reply }).is_ok() {
            let _ = recv.await;
        }
    }

    /// Flushes any pending debounced commit and awaits its completion.
    /// Must be awaited before process exit (spec §6 shutdown contract).
    pub async fn handle_termination(&self) -> std::result::Result<(), TrackerStatsError> {
        let (reply, recv) = oneshot::channel();
        if self
            .commands
            .send(ActorCommand::Terminate { reply })
            .is_err()
        {
            return Err(error_support::convert_log_report_error(Error::ActorGone));
        }
        match recv.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(error_support::convert_log_report_error(e)),
            Err(_) => Err(error_support::convert_log_report_error(Error::ActorGone)),
        }
    }

    /// The 7-day aggregate (spec §6), with today's in-memory counters summed
    /// on top of whatever has already reached the store.
    pub async fn fetch_privacy_stats(
        &self,
    ) -> std::result::Result<HashMap<String, i64>, TrackerStatsError> {
        let (reply, recv) = oneshot::channel();
        if self
            .commands
            .send(ActorCommand::FetchSevenDay { reply })
            .is_err()
        {
            return Err(error_support::convert_log_report_error(Error::ActorGone));
        }
        match recv.await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(error_support::convert_log_report_error(e)),
            Err(_) => Err(error_support::convert_log_report_error(Error::ActorGone)),
        }
    }

    /// Today's persisted counts only (does not include any not-yet-committed
    /// in-memory increments). The reference implementation keeps this
    /// store-only variant alongside the merged `fetch_privacy_stats`.
    pub async fn current_day_stats(
        &self,
    ) -> std::result::Result<HashMap<String, i64>, TrackerStatsError> {
        let (reply, recv) = oneshot::channel();
        if self
            .commands
            .send(ActorCommand::FetchCurrentDay { reply })
            .is_err()
        {
            return Err(error_support::convert_log_report_error(Error::ActorGone));
        }
        match recv.await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(error_support::convert_log_report_error(e)),
            Err(_) => Err(error_support::convert_log_report_error(Error::ActorGone)),
        }
    }

    /// Deletes all persisted rows and resets the in-memory pack, emitting an
    /// update notification (spec §6).
    pub async fn clear_privacy_stats(&self) -> std::result::Result<(), TrackerStatsError> {
        let (reply, recv) = oneshot::channel();
        if self
            .commands
            .send(ActorCommand::ClearStats { reply })
            .is_err()
        {
            return Err(error_support::convert_log_report_error(Error::ActorGone));
        }
        match recv.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(error_support::convert_log_report_error(e)),
            Err(_) => Err(error_support::convert_log_report_error(Error::ActorGone)),
        }
    }
}

fn schedule_debounce(
    pending: &mut Option<JoinHandle<()>>,
    self_tx: &mpsc::UnboundedSender<ActorCommand>,
    debounce: Duration,
) {
    if let Some(handle) = pending.take() {
        handle.abort();
    }
    let tx = self_tx.clone();
    *pending = Some(tokio::spawn(async move {
        tokio::time::sleep(debounce).await;
        let _ = tx.send(ActorCommand::Flush);
    }));
}

async fn run_actor(
    mut commands: mpsc::UnboundedReceiver<ActorCommand>,
    self_tx: mpsc::UnboundedSender<ActorCommand>,
    db: mpsc::UnboundedSender<DbCommand>,
    debounce: Duration,
    clock: Arc<dyn Clock>,
) {
    let today = start_of_day(clock.now());
    let mut pack = BlockedTrackersPack::empty(today);
    let mut pending_commit: Option<JoinHandle<()>> = None;

    while let Some(cmd) = commands.recv().await {
        match cmd {
            ActorCommand::Record { company, reply } => {
                let today = start_of_day(clock.now());
                // Equality, not ordering: any mismatch (including the clock
                // stepping backward) is treated as a rollover.
                if pack.timestamp != today {
                    let _ = db.send(DbCommand::Commit(CommitRequest {
                        pack: pack.clone(),
                        ack: None,
                    }));
                    pack = BlockedTrackersPack::empty(today);
                }
                pack.record(&company);
                schedule_debounce(&mut pending_commit, &self_tx, debounce);
                let _ = reply.send(());
            }
            ActorCommand::Reset { reply } => {
                if let Some(handle) = pending_commit.take() {
                    handle.abort();
                }
                pack = BlockedTrackersPack::empty(start_of_day(clock.now()));
                let _ = reply.send(());
            }
            ActorCommand::Terminate { reply } => {
                if let Some(handle) = pending_commit.take() {
                    handle.abort();
                }
                let outcome = if pack.is_empty() {
                    Ok(())
                } else {
                    let (ack_tx, ack_rx) = oneshot::channel();
                    if db
                        .send(DbCommand::Commit(CommitRequest {
                            pack: pack.clone(),
                            ack: Some(ack_tx),
                        }))
                        .is_err()
                    {
                        Err(Error::ActorGone)
                    } else {
                        ack_rx.await.unwrap_or(Err(Error::ActorGone))
                    }
                };
                let _ = reply.send(outcome);
                // The termination contract is one-shot; stop serving the
                // mailbox once it's been honored.
                break;
            }
            ActorCommand::FetchSevenDay { reply } => {
                let cutoff = retention_cutoff(start_of_day(clock.now()));
                let (db_reply, db_recv) = oneshot::channel();
                if db
                    .send(DbCommand::Sum7Day {
                        cutoff,
                        reply: db_reply,
                    })
                    .is_err()
                {
                    let _ = reply.send(Err(Error::ActorGone));
                    continue;
                }
                let result = match db_recv.await {
                    Ok(Ok(mut persisted)) => {
                        for (company, count) in &pack.trackers {
                            *persisted.entry(company.clone()).or_insert(0) += count;
                        }
                        persisted.retain(|_, count| *count != 0);
                        Ok(persisted)
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(Error::ActorGone),
                };
                let _ = reply.send(result);
            }
            ActorCommand::FetchCurrentDay { reply } => {
                let today = start_of_day(clock.now());
                let (db_reply, db_recv) = oneshot::channel();
                if db
                    .send(DbCommand::CountsForDay {
                        day: today,
                        reply: db_reply,
                    })
                    .is_err()
                {
                    let _ = reply.send(Err(Error::ActorGone));
                    continue;
                }
                let result = db_recv.await.unwrap_or(Err(Error::ActorGone));
                let _ = reply.send(result);
            }
            ActorCommand::ClearStats { reply } => {
                if let Some(handle) = pending_commit.take() {
                    handle.abort();
                }
                let (db_reply, db_recv) = oneshot::channel();
                if db.send(DbCommand::ClearAll { reply: db_reply }).is_err() {
                    let _ = reply.send(Err(Error::ActorGone));
                    continue;
                }
                let result = match db_recv.await {
                    Ok(Ok(())) => {
                        pack = BlockedTrackersPack::empty(start_of_day(clock.now()));
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(Error::ActorGone),
                };
                let _ = reply.send(result);
            }
            ActorCommand::Flush => {
                pending_commit = None;
                if !pack.is_empty() {
                    let _ = db.send(DbCommand::Commit(CommitRequest {
                        pack: pack.clone(),
                        ack: None,
                    }));
                }
            }
        }
    }
}

async fn run_db_executor(
    store: Arc<dyn BlockedTrackersStore>,
    mut commands: mpsc::UnboundedReceiver<DbCommand>,
    updates: broadcast::Sender<()>,
    events: broadcast::Sender<TrackerStatsError>,
    clock: Arc<dyn Clock>,
) {
    while let Some(cmd) = commands.recv().await {
        match cmd {
            DbCommand::Commit(CommitRequest { pack, ack }) => {
                let today = start_of_day(clock.now());
                let is_today = pack.timestamp == today;
                let mut outcome: CommitOutcome = Ok(());
                for (company, count) in &pack.trackers {
                    if let Err(e) = store.upsert(pack.timestamp, company, *count).await {
                        outcome = Err(Error::Store(e));
                    }
                }
                if outcome.is_ok() && !is_today {
                    let cutoff = retention_cutoff(today);
                    if let Err(e) = store.purge_older_than(cutoff).await {
                        outcome = Err(Error::Store(e));
                    }
                }
                // Previous-day commits never notify: they're always paired
                // with a subsequent current-day commit that will.
                if outcome.is_ok() && is_today {
                    let _ = updates.send(());
                }
                // The debounced commit path has no caller waiting on `ack`;
                // that's the only path whose errors would otherwise vanish,
                // so it's the only one reported on the event channel. Acked
                // callers (e.g. `handle_termination`) already convert and log
                // the error they get back through their own reply.
                if ack.is_none() {
                    if let Err(e) = &outcome {
                        let _ = events.send(error_support::convert_log_report_error(e.clone()));
                    }
                }
                if let Some(ack) = ack {
                    let _ = ack.send(outcome);
                }
            }
            DbCommand::Sum7Day { cutoff, reply } => {
                let result = store.sum_since(cutoff).await.map_err(Error::FetchSummary);
                let _ = reply.send(result);
            }
            DbCommand::CountsForDay { day, reply } => {
                let result = store
                    .counts_for_day(day)
                    .await
                    .map_err(Error::LoadCurrent);
                let _ = reply.send(result);
            }
            DbCommand::ClearAll { reply } => {
                let result = store.clear_all().await.map_err(Error::Clear);
                if result.is_ok() {
                    let _ = updates.send(());
                }
                let _ = reply.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clock::TestClock;
    use crate::store::MemoryStore;

    fn aggregator_with(debounce_ms: u64) -> (TrackerAggregator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let agg = TrackerAggregator::new(store.clone(), StdDuration::from_millis(debounce_ms));
        (agg, store)
    }

    /// A store whose `upsert` always fails, used to exercise the event
    /// channel's debounced-commit-error path.
    struct FailingStore;

    #[async_trait::async_trait]
    impl crate::store::BlockedTrackersStore for FailingStore {
        async fn upsert(
            &self,
            _day: Day,
            _company: &str,
            _count: i64,
        ) -> std::result::Result<(), crate::store::StoreError> {
            Err(crate::store::StoreError("disk full".into()))
        }
        async fn purge_older_than(&self, _cutoff: Day) -> std::result::Result<(), crate::store::StoreError> {
            Ok(())
        }
        async fn sum_since(
            &self,
            _cutoff: Day,
        ) -> std::result::Result<HashMap<String, i64>, crate::store::StoreError> {
            Ok(HashMap::new())
        }
        async fn counts_for_day(
            &self,
            _day: Day,
        ) -> std::result::Result<HashMap<String, i64>, crate::store::StoreError> {
            Ok(HashMap::new())
        }
        async fn clear_all(&self) -> std::result::Result<(), crate::store::StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn debounced_commit_failure_is_reported_on_the_event_channel() {
        let agg = TrackerAggregator::new(Arc::new(FailingStore), StdDuration::from_millis(20));
        let mut events = agg.subscribe_events();

        agg.record("A").await;

        let err = tokio::time::timeout(StdDuration::from_millis(500), events.recv())
            .await
            .expect("the failed debounced commit should report an event")
            .unwrap();
        assert_eq!(err, TrackerStatsError::FailedToStore);
    }

    #[tokio::test]
    async fn burst_of_records_produces_one_commit() {
        let (agg, store) = aggregator_with(50);
        let mut updates = agg.subscribe_updates();

        agg.record("A").await;
        agg.record("A").await;
        agg.record("A").await;

        tokio::time::timeout(StdDuration::from_millis(500), updates.recv())
            .await
            .expect("commit should fire within the timeout")
            .unwrap();

        let stats = agg.fetch_privacy_stats().await.unwrap();
        assert_eq!(stats.get("A"), Some(&3));

        let today = start_of_day(Utc::now());
        let rows = store.snapshot();
        assert_eq!(rows.get(&(today, "A".to_string())), Some(&3));
    }

    #[tokio::test]
    async fn reset_discards_pending_commit() {
        let (agg, store) = aggregator_with(50);
        agg.record("A").await;
        agg.reset().await;

        tokio::time::sleep(StdDuration::from_millis(150)).await;
        assert!(store.snapshot().is_empty());

        let stats = agg.fetch_privacy_stats().await.unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn termination_flushes_pending_commit_before_returning() {
        let (agg, store) = aggregator_with(60_000);
        agg.record("A").await;
        agg.handle_termination().await.unwrap();

        let today = start_of_day(Utc::now());
        let rows = store.snapshot();
        assert_eq!(rows.get(&(today, "A".to_string())), Some(&1));
    }

    #[tokio::test]
    async fn clear_privacy_stats_wipes_store_and_emits_update() {
        let (agg, store) = aggregator_with(20);
        agg.record("A").await;
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert!(!store.snapshot().is_empty());

        let mut updates = agg.subscribe_updates();
        agg.clear_privacy_stats().await.unwrap();
        tokio::time::timeout(StdDuration::from_millis(500), updates.recv())
            .await
            .expect("clear should notify")
            .unwrap();

        assert!(store.snapshot().is_empty());
        let stats = agg.fetch_privacy_stats().await.unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn seven_day_fetch_merges_in_memory_pack_on_top_of_store() {
        let (agg, store) = aggregator_with(60_000);
        let today = start_of_day(Utc::now());
        store.upsert(today - chrono::Duration::days(2), "A", 4).await.unwrap();

        agg.record("A").await;

        let stats = agg.fetch_privacy_stats().await.unwrap();
        assert_eq!(stats.get("A"), Some(&5));
    }

    #[tokio::test]
    async fn day_rollover_commits_old_pack_immediately_then_debounces_new_one() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(TestClock::new(
            "2026-07-27T10:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        ));
        let agg = TrackerAggregator::with_clock(
            store.clone(),
            StdDuration::from_millis(50),
            clock.clone(),
        );
        let mut updates = agg.subscribe_updates();

        let monday = start_of_day(clock.now());
        agg.record("A").await;

        // Roll the wall clock over to the next day before the debounce for
        // Monday's record would have fired.
        clock.advance(chrono::Duration::hours(14));
        let tuesday = start_of_day(clock.now());
        assert_ne!(monday, tuesday);

        agg.record("B").await;

        // Monday's pack is committed immediately on rollover, with no
        // update notification (it isn't today's commit).
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        let rows = store.snapshot();
        assert_eq!(rows.get(&(monday, "A".to_string())), Some(&1));
        assert!(!rows.contains_key(&(tuesday, "B".to_string())));

        // Tuesday's pack commits after the debounce interval, and that one
        // does notify.
        tokio::time::timeout(StdDuration::from_millis(500), updates.recv())
            .await
            .expect("tuesday's debounced commit should fire")
            .unwrap();
        let rows = store.snapshot();
        assert_eq!(rows.get(&(tuesday, "B".to_string())), Some(&1));
    }

    #[tokio::test]
    async fn retention_purges_rows_older_than_seven_days_on_rollover_commit() {
        let store = Arc::new(MemoryStore::new());
        let start = "2026-07-27T23:59:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = Arc::new(TestClock::new(start));
        let today = start_of_day(start);
        store
            .upsert(today - chrono::Duration::days(10), "Stale", 9)
            .await
            .unwrap();
        store
            .upsert(today - chrono::Duration::days(3), "Recent", 2)
            .await
            .unwrap();

        let agg =
            TrackerAggregator::with_clock(store.clone(), StdDuration::from_millis(50), clock.clone());
        agg.record("A").await;

        clock.advance(chrono::Duration::hours(1));
        agg.record("B").await;

        tokio::time::sleep(StdDuration::from_millis(10)).await;
        let rows = store.snapshot();
        assert!(!rows
            .keys()
            .any(|(day, company)| company == "Stale" && *day == today - chrono::Duration::days(10)));
        assert!(rows
            .keys()
            .any(|(day, company)| company == "Recent" && *day == today - chrono::Duration::days(3)));
    }
}
