use crate::core::{DbError, RankingRecord, Result};
use crate::executor::QueryExecutor;
use crate::planner::QueryPredicate;
use crate::storage::{RecordSource, StoreChange};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, event, info_span};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CountState {
    #[default]
    Pending,
    Ready(usize),
    Failed(DbError),
}

impl CountState {
    pub fn total(&self) -> Option<usize> {
        match self {
            Self::Ready(total) => Some(*total),
            _ => None,
        }
    }
}

/// Live record counts, independent of any view parameters.
#[derive(Clone)]
pub struct CountService {
    source: Arc<dyn RecordSource>,
    runtime: Handle,
}

impl CountService {
    pub fn new(source: Arc<dyn RecordSource>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| DbError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self { source, runtime })
    }

    /// Count of every record in the collection, filters or not. This is what
    /// sizes pagination controls.
    pub fn subscribe(&self) -> CountSubscription {
        self.spawn(None)
    }

    /// Count of records matching `predicate`, for callers that want the
    /// pagination sized to the filtered result set instead.
    pub fn subscribe_filtered(&self, predicate: QueryPredicate) -> CountSubscription {
        self.spawn(Some(predicate))
    }

    fn spawn(&self, predicate: Option<QueryPredicate>) -> CountSubscription {
        let (tx, rx) = watch::channel(CountState::Pending);
        let span = info_span!("count.feed", filtered = predicate.is_some());
        let counter = Counter {
            source: Arc::clone(&self.source),
            predicate,
            tx,
            total: 0,
            version: 0,
        };
        let task = self.runtime.spawn(counter.run().instrument(span));
        CountSubscription { rx, task }
    }
}

struct Counter {
    source: Arc<dyn RecordSource>,
    predicate: Option<QueryPredicate>,
    tx: watch::Sender<CountState>,
    total: usize,
    version: u64,
}

impl Counter {
    async fn run(mut self) {
        let mut changes = self.source.subscribe_changes();

        if let Err(err) = self.recount().await {
            return self.fail(err);
        }

        loop {
            let received = tokio::select! {
                _ = self.tx.closed() => return,
                received = changes.recv() => received,
            };

            let outcome = match received {
                Ok(change) => self.apply(&change),
                Err(RecvError::Lagged(skipped)) => {
                    event!(Level::WARN, skipped, "count feed lagged, recounting");
                    self.recount().await
                }
                Err(RecvError::Closed) => Err(DbError::StoreClosed),
            };

            if let Err(err) = outcome {
                return self.fail(err);
            }
        }
    }

    async fn recount(&mut self) -> Result<()> {
        let snapshot = self.source.snapshot().await?;
        let total = match &self.predicate {
            Some(predicate) => QueryExecutor::count(&snapshot.table, predicate)?,
            None => snapshot.table.len(),
        };
        self.version = snapshot.version;
        self.publish(total);
        Ok(())
    }

    fn apply(&mut self, change: &StoreChange) -> Result<()> {
        if change.version <= self.version {
            return Ok(());
        }
        self.version = change.version;

        let counted = |record: &Option<Arc<RankingRecord>>| -> Result<bool> {
            match (record, &self.predicate) {
                (None, _) => Ok(false),
                (Some(_), None) => Ok(true),
                (Some(record), Some(predicate)) => predicate.matches(record),
            }
        };
        let was = counted(&change.before)?;
        let is = counted(&change.after)?;

        let total = match (was, is) {
            (false, true) => self.total + 1,
            (true, false) => self.total.saturating_sub(1),
            _ => return Ok(()),
        };
        self.publish(total);
        Ok(())
    }

    fn publish(&mut self, total: usize) {
        self.total = total;
        self.tx.send_if_modified(|state| {
            if *state == CountState::Ready(total) {
                return false;
            }
            *state = CountState::Ready(total);
            true
        });
    }

    fn fail(&self, err: DbError) {
        event!(Level::ERROR, error = %err, "count feed failed");
        self.tx.send_replace(CountState::Failed(err));
    }
}

/// Handle on one live count. Dropping it stops the feed.
pub struct CountSubscription {
    rx: watch::Receiver<CountState>,
    task: JoinHandle<()>,
}

impl CountSubscription {
    pub fn current(&self) -> CountState {
        self.rx.borrow().clone()
    }

    pub fn total(&self) -> Option<usize> {
        self.rx.borrow().total()
    }

    /// Wait for the next state change.
    pub async fn changed(&mut self) -> Result<CountState> {
        self.rx.changed().await.map_err(|_| DbError::StoreClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the state satisfies `accept`, returning that state.
    pub async fn wait_for(&mut self, mut accept: impl FnMut(&CountState) -> bool) -> Result<CountState> {
        let state = self
            .rx
            .wait_for(|state| accept(state))
            .await
            .map_err(|_| DbError::StoreClosed)?;
        Ok(state.clone())
    }

    /// Wait until the count reaches `expected`, or the feed fails.
    pub async fn wait_for_total(&mut self, expected: usize) -> Result<usize> {
        match self
            .wait_for(|state| matches!(state, CountState::Failed(_)) || state.total() == Some(expected))
            .await?
        {
            CountState::Failed(err) => Err(err),
            _ => Ok(expected),
        }
    }
}

impl Drop for CountSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
