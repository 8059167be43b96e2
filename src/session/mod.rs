//! One logical client: a parameter store bound to a live page and a live count.

pub mod params_store;

pub use params_store::{ObserverId, ViewParameterStore};

use crate::core::{RankedRecord, Result, ViewParameters};
use crate::planner::FilterBuilder;
use crate::service::ranking::Epoched;
use crate::service::{CountService, CountState, CountSubscription, PageView, RankingEvent, RankingQueryService, ViewState};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Level, event};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Default)]
struct FeedSlot {
    handle: Option<JoinHandle<()>>,
    params: Option<ViewParameters>,
}

/// Owns the session's current ranking feed. Every restart bumps the epoch
/// before the new feed exists, and delivery drops anything tagged with an
/// older epoch.
///
/// Restarts read the parameter store while holding the feed slot, so the last
/// restart to run always plans from the latest stored parameters.
struct FeedControl {
    session: SessionId,
    epoch: AtomicU64,
    feed: Mutex<FeedSlot>,
    tx: mpsc::Sender<Epoched>,
    ranking: RankingQueryService,
    filter: FilterBuilder,
}

impl FeedControl {
    fn restart(&self, store: &ViewParameterStore) {
        let mut feed = self.feed.lock().unwrap_or_else(PoisonError::into_inner);
        let params = store.get();
        if feed.handle.is_some() && feed.params.as_ref() == Some(&params) {
            // A nested change already planned this exact view.
            return;
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(stale) = feed.handle.take() {
            stale.abort();
        }

        let (predicate, window) = self.filter.plan(&params);
        event!(
            Level::DEBUG,
            session = %self.session,
            epoch,
            page = params.page,
            sort = %params.sort_field,
            realm = %params.realm_filter,
            "session feed restarted"
        );
        feed.handle = Some(self.ranking.spawn_feed(predicate, window, self.tx.clone(), epoch));
        feed.params = Some(params);
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if let Some(feed) = self.feed.lock().unwrap_or_else(PoisonError::into_inner).handle.take() {
            feed.abort();
        }
    }
}

/// Live leaderboard for one client.
///
/// Parameter changes made through the attached [`ViewParameterStore`] restart
/// the ranking feed. Once a change has returned, `next_event` never yields an
/// event from the feed it replaced.
pub struct LeaderboardSession {
    id: SessionId,
    params: Arc<ViewParameterStore>,
    observer: ObserverId,
    control: Arc<FeedControl>,
    rx: mpsc::Receiver<Epoched>,
    view: PageView,
    view_epoch: u64,
    count: CountSubscription,
}

impl LeaderboardSession {
    pub(crate) fn open(
        params: Arc<ViewParameterStore>,
        ranking: RankingQueryService,
        counts: &CountService,
        filter: FilterBuilder,
    ) -> Result<Self> {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(ranking.event_buffer());
        let control = Arc::new(FeedControl {
            session: id,
            epoch: AtomicU64::new(0),
            feed: Mutex::new(FeedSlot::default()),
            tx,
            ranking,
            filter,
        });

        let weak = Arc::downgrade(&control);
        let store = Arc::downgrade(&params);
        let observer = params.subscribe(move |_| {
            if let (Some(control), Some(store)) = (weak.upgrade(), store.upgrade()) {
                control.restart(&store);
            }
        });
        control.restart(&params);

        event!(Level::INFO, session = %id, "leaderboard session opened");

        Ok(Self {
            id,
            params,
            observer,
            control,
            rx,
            view: PageView::new(),
            view_epoch: 0,
            count: counts.subscribe(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The parameter store driving this session.
    pub fn params(&self) -> &Arc<ViewParameterStore> {
        &self.params
    }

    /// Next event of the current feed, applied to the local page first.
    pub async fn next_event(&mut self) -> Option<RankingEvent> {
        loop {
            let tagged = self.rx.recv().await?;
            if tagged.epoch != self.control.current_epoch() {
                event!(Level::TRACE, session = %self.id, epoch = tagged.epoch, "stale ranking event dropped");
                continue;
            }

            if tagged.epoch != self.view_epoch {
                self.view.reset();
                self.view_epoch = tagged.epoch;
            }
            match &tagged.event {
                RankingEvent::Snapshot { version, rows } => self.view.replace(*version, rows.clone()),
                RankingEvent::Changes { version, changes } => self.view.apply(*version, changes),
                RankingEvent::Failed(err) => self.view.fail(err.clone()),
            }
            return Some(tagged.event);
        }
    }

    /// Rows of the current page as of the last delivered event.
    pub fn rows(&self) -> &[RankedRecord] {
        if self.view_epoch == self.control.current_epoch() {
            self.view.rows()
        } else {
            &[]
        }
    }

    pub fn state(&self) -> ViewState {
        if self.view_epoch == self.control.current_epoch() {
            self.view.state().clone()
        } else {
            ViewState::Loading
        }
    }

    /// Unfiltered collection size, for pagination controls.
    pub fn total(&self) -> Option<usize> {
        self.count.total()
    }

    pub fn count_state(&self) -> CountState {
        self.count.current()
    }

    pub fn count(&mut self) -> &mut CountSubscription {
        &mut self.count
    }

    /// Number of pages the total count spans at `page_size` rows per page.
    pub fn page_count(&self, page_size: u64) -> Option<u64> {
        let total = self.total()? as u64;
        Some(total.div_ceil(page_size.max(1)))
    }
}

impl Drop for LeaderboardSession {
    fn drop(&mut self) {
        self.params.unsubscribe(self.observer);
        self.control.stop();
        event!(Level::DEBUG, session = %self.id, "leaderboard session closed");
    }
}
