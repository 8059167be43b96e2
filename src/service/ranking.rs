use super::diff::{RowChange, diff_rows};
use crate::config::LeaderboardConfig;
use crate::core::{DbError, RankedRecord, Result};
use crate::executor::QueryExecutor;
use crate::planner::{PageWindow, QueryPredicate};
use crate::storage::{RecordSource, StoreChange};
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, event, info_span};

/// What a live ranking feed delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingEvent {
    /// Full page; always the first event of a feed.
    Snapshot { version: u64, rows: Vec<RankedRecord> },
    /// Incremental update of the page last delivered.
    Changes { version: u64, changes: Vec<RowChange> },
    /// The feed stopped. Distinct from an empty page.
    Failed(DbError),
}

/// Event tagged with the feed generation that produced it.
#[derive(Debug)]
pub(crate) struct Epoched {
    pub epoch: u64,
    pub event: RankingEvent,
}

/// Runs window queries and keeps them live.
#[derive(Clone)]
pub struct RankingQueryService {
    source: Arc<dyn RecordSource>,
    runtime: Handle,
    event_buffer: usize,
}

impl RankingQueryService {
    /// Must be called from within a tokio runtime; feeds run on that runtime.
    pub fn new(source: Arc<dyn RecordSource>, config: &LeaderboardConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| DbError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self {
            source,
            runtime,
            event_buffer: config.event_buffer.max(1),
        })
    }

    /// One-shot evaluation against the current snapshot.
    pub async fn query(&self, predicate: &QueryPredicate, window: &PageWindow) -> Result<Vec<RankedRecord>> {
        let snapshot = self.source.snapshot().await?;
        QueryExecutor::execute(&snapshot.table, predicate, window)
    }

    /// Start a live feed. Dropping the subscription cancels it.
    pub fn subscribe(&self, predicate: QueryPredicate, window: PageWindow) -> RankingSubscription {
        let (tx, rx) = mpsc::channel(self.event_buffer);
        let task = self.spawn_feed(predicate, window, tx, 0);
        RankingSubscription { rx, task }
    }

    pub(crate) fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    pub(crate) fn spawn_feed(
        &self,
        predicate: QueryPredicate,
        window: PageWindow,
        tx: mpsc::Sender<Epoched>,
        epoch: u64,
    ) -> JoinHandle<()> {
        let span = info_span!(
            "ranking.feed",
            epoch,
            sort = %window.sort_field,
            offset = window.offset,
            realm = ?predicate.realm,
        );
        let feed = Feed {
            source: Arc::clone(&self.source),
            predicate,
            window,
            tx,
            epoch,
            rows: Vec::new(),
            version: 0,
        };
        self.runtime.spawn(feed.run().instrument(span))
    }
}

struct Feed {
    source: Arc<dyn RecordSource>,
    predicate: QueryPredicate,
    window: PageWindow,
    tx: mpsc::Sender<Epoched>,
    epoch: u64,
    rows: Vec<RankedRecord>,
    version: u64,
}

impl Feed {
    async fn run(mut self) {
        // Subscribe before the first snapshot so no write falls in between.
        let mut changes = self.source.subscribe_changes();

        match self.load().await {
            Ok(rows) => {
                let event = RankingEvent::Snapshot { version: self.version, rows };
                if !self.send(event).await {
                    return;
                }
            }
            Err(err) => return self.fail(err).await,
        }

        loop {
            let received = tokio::select! {
                _ = self.tx.closed() => {
                    event!(Level::DEBUG, "ranking feed consumer gone");
                    return;
                }
                received = changes.recv() => received,
            };

            let outcome = match received {
                Ok(change) => self.on_change(&change).await,
                Err(RecvError::Lagged(skipped)) => {
                    event!(Level::WARN, skipped, "ranking feed lagged, re-querying");
                    self.requery().await
                }
                Err(RecvError::Closed) => Err(DbError::StoreClosed),
            };

            match outcome {
                Ok(Some(event)) => {
                    if !self.send(event).await {
                        return;
                    }
                }
                Ok(None) => {}
                Err(err) => return self.fail(err).await,
            }
        }
    }

    async fn load(&mut self) -> Result<Vec<RankedRecord>> {
        let snapshot = self.source.snapshot().await?;
        let rows = QueryExecutor::execute(&snapshot.table, &self.predicate, &self.window)?;
        self.version = snapshot.version;
        self.rows = rows.clone();
        event!(Level::DEBUG, version = self.version, rows = self.rows.len(), "ranking feed loaded");
        Ok(rows)
    }

    async fn on_change(&mut self, change: &StoreChange) -> Result<Option<RankingEvent>> {
        // Already covered by the snapshot the page was built from.
        if change.version <= self.version {
            return Ok(None);
        }
        if !self.affected_by(change)? {
            self.version = change.version;
            return Ok(None);
        }
        self.requery().await
    }

    /// A change matters when an old or new version of the record matches the
    /// predicate and could land on this page: the page has room, the record is
    /// already on it, or it sorts at or above the page's last row.
    fn affected_by(&self, change: &StoreChange) -> Result<bool> {
        let limit = usize::try_from(self.window.limit).unwrap_or(usize::MAX);
        for record in change.versions() {
            if !self.predicate.matches(record)? {
                continue;
            }
            if self.rows.len() < limit || self.rows.iter().any(|row| row.id() == record.id) {
                return Ok(true);
            }
            if let Some(last) = self.rows.last()
                && QueryExecutor::sorts_within(&self.window, record, &last.record)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn requery(&mut self) -> Result<Option<RankingEvent>> {
        let previous = std::mem::take(&mut self.rows);
        let rows = self.load().await?;
        let changes = diff_rows(&previous, &rows);
        if changes.is_empty() {
            return Ok(None);
        }
        Ok(Some(RankingEvent::Changes {
            version: self.version,
            changes,
        }))
    }

    async fn send(&self, event: RankingEvent) -> bool {
        let epoch = self.epoch;
        self.tx.send(Epoched { epoch, event }).await.is_ok()
    }

    async fn fail(&self, err: DbError) {
        event!(Level::ERROR, error = %err, "ranking feed failed");
        let _ = self.send(RankingEvent::Failed(err)).await;
    }
}

/// Handle on one live ranking feed.
pub struct RankingSubscription {
    rx: mpsc::Receiver<Epoched>,
    task: JoinHandle<()>,
}

impl RankingSubscription {
    /// Next event, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<RankingEvent> {
        self.rx.recv().await.map(|tagged| tagged.event)
    }
}

impl Drop for RankingSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Stream for RankingSubscription {
    type Item = RankingEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut()
            .rx
            .poll_recv(cx)
            .map(|tagged| tagged.map(|tagged| tagged.event))
    }
}
