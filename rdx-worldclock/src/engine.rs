//! The core engine that ties the store, the ticker and the views together.

use crate::catalog::CityOption;
use crate::common::{CityId, ViewId};
use crate::components::view::{ClockFrame, ClockView, ViewKind};
use crate::config::{StorageBackend, WorldClockConfig};
use crate::events::{StateEvent, SystemEvent};
use crate::model::{default_state, AppState, City, ClockSettings};
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::store::{NewCity, StateStore, StoreError};
use crate::time::{TickEvent, TickScheduler, TickerGuard, TokioScheduler};
use slotmap::SlotMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, trace};

/// The main world clock engine.
///
/// This struct is the single handle front-ends talk to. It owns the state
/// store, the attached views and the ticker that re-renders them. It is cheap
/// to clone; every clone drives the same running instance.
#[derive(Clone)]
pub struct WorldClockEngine {
    config: Arc<WorldClockConfig>,
    scheduler: Arc<dyn TickScheduler>,
    store: Arc<RwLock<StateStore>>,
    views: Arc<RwLock<SlotMap<ViewId, ClockView>>>,
    ticker: Arc<Mutex<Option<TickerGuard>>>,
    /// Subscribed at construction so ticks fired before `run` still reach the dispatcher.
    pending_ticks: Arc<Mutex<Option<broadcast::Receiver<Arc<TickEvent>>>>>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    frame_sender: broadcast::Sender<Arc<ClockFrame>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    state_event_sender: broadcast::Sender<StateEvent>,
}

// Core implementation block for internal logic.
impl WorldClockEngine {
    /// Creates an engine around an already opened store.
    pub fn new(
        config: WorldClockConfig,
        store: StateStore,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 64;
        let (tick_sender, pending_ticks) = broadcast::channel(16);
        let (frame_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (state_event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            scheduler,
            store: Arc::new(RwLock::new(store)),
            views: Arc::new(RwLock::new(SlotMap::with_key())),
            ticker: Arc::new(Mutex::new(None)),
            pending_ticks: Arc::new(Mutex::new(Some(pending_ticks))),
            tick_sender,
            frame_sender,
            system_event_sender,
            state_event_sender,
        }
    }

    /// Opens the configured storage, loads the state and uses the tokio ticker.
    pub fn from_config(config: WorldClockConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::File => Arc::new(FileStorage::open(&config.storage.dir)?),
        };
        let store = StateStore::open(storage, config.storage.key.clone(), default_state());
        Ok(Self::new(config, store, Arc::new(TokioScheduler)))
    }

    /// Runs the dispatcher until Ctrl+C.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Press Ctrl+C to shut down.");
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await
    }

    /// Runs the dispatcher until `shutdown` completes, then releases the ticker.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        info!("WorldClockEngine starting up...");
        let (shutdown_tx, _) = broadcast::channel(1);
        let tick_rx = match self.pending_ticks.lock().await.take() {
            Some(rx) => rx,
            None => self.tick_sender.subscribe(),
        };

        let dispatcher = self.clone();
        let dispatcher_shutdown_rx = shutdown_tx.subscribe();
        let dispatcher_task = tokio::spawn(async move {
            dispatcher
                .dispatcher_loop(tick_rx, dispatcher_shutdown_rx)
                .await
        });

        shutdown.await;

        info!("Shutdown signal received. Stopping dispatcher...");
        shutdown_tx.send(()).ok();
        dispatcher_task.await?;
        self.release_ticker().await;
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("WorldClockEngine has shut down.");
        Ok(())
    }

    #[doc(hidden)]
    async fn dispatcher_loop(
        self,
        mut tick_rx: broadcast::Receiver<Arc<TickEvent>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                tick = tick_rx.recv() => match tick {
                    Ok(tick) => {
                        trace!("Tick #{} received.", tick.tick_count);
                        self.render_views(&tick).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Dispatcher lagged; skipped {} ticks.", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    #[doc(hidden)]
    async fn render_views(&self, tick: &TickEvent) -> Vec<Arc<ClockFrame>> {
        let store = self.store.read().await;
        let views = self.views.read().await;
        let mut frames = Vec::with_capacity(views.len());
        for (id, view) in views.iter() {
            let frame = Arc::new(view.render(id, store.state(), tick));
            self.frame_sender.send(frame.clone()).ok();
            frames.push(frame);
        }
        frames
    }

    /// Makes the running ticker match the current settings and attached views.
    ///
    /// No views means no ticker. Otherwise the ticker runs at the cadence the
    /// seconds setting asks for, restarted only when that cadence changes.
    #[doc(hidden)]
    async fn sync_ticker(&self) {
        let has_views = !self.views.read().await.is_empty();
        let desired = if has_views {
            let show_seconds = self.store.read().await.state().settings.show_seconds;
            Some(self.config.refresh.interval_for(show_seconds))
        } else {
            None
        };

        let mut ticker = self.ticker.lock().await;
        let current = ticker.as_ref().map(TickerGuard::interval);
        if current == desired {
            return;
        }
        // Release the old ticker before starting its replacement.
        ticker.take();
        match desired {
            Some(interval) => {
                debug!("Starting ticker at {:?}.", interval);
                *ticker = Some(self.scheduler.start(interval, self.tick_sender.clone()));
                self.system_event_sender
                    .send(SystemEvent::TickerStarted { interval })
                    .ok();
            }
            None => {
                debug!("Stopping ticker.");
                self.system_event_sender
                    .send(SystemEvent::TickerStopped)
                    .ok();
            }
        }
    }

    #[doc(hidden)]
    async fn release_ticker(&self) {
        if self.ticker.lock().await.take().is_some() {
            self.system_event_sender
                .send(SystemEvent::TickerStopped)
                .ok();
        }
    }

    /// Runs `action` against the store and announces the new document if it changed.
    #[doc(hidden)]
    async fn apply<T>(&self, action: impl FnOnce(&mut StateStore) -> T) -> T {
        let (result, snapshot) = {
            let mut store = self.store.write().await;
            let before = store.state().clone();
            let result = action(&mut store);
            let changed = *store.state() != before;
            (result, changed.then(|| Arc::new(store.state().clone())))
        };
        if let Some(snapshot) = snapshot {
            self.state_event_sender
                .send(StateEvent::Replaced(snapshot))
                .ok();
            self.sync_ticker().await;
        }
        result
    }
}

// Public API implementation block.
impl WorldClockEngine {
    pub fn config(&self) -> &WorldClockConfig {
        &self.config
    }

    /// A copy of the current application state.
    pub async fn state(&self) -> AppState {
        self.store.read().await.state().clone()
    }

    /// Swaps in a complete new state and persists it.
    pub async fn replace(&self, new_state: AppState) {
        self.apply(|store| store.replace(new_state)).await;
    }

    /// Validates and appends a city; returns its new id.
    pub async fn add_city(&self, city: NewCity) -> Result<CityId, StoreError> {
        let id = self.apply(|store| store.add_city(city)).await?;
        debug!("City {} added.", id);
        Ok(id)
    }

    pub async fn add_from_catalog(&self, option: &CityOption) -> Result<CityId, StoreError> {
        self.add_city(NewCity::from(option)).await
    }

    /// Returns `true` if the city existed.
    pub async fn remove_city(&self, id: &CityId) -> bool {
        self.apply(|store| store.remove_city(id)).await
    }

    pub async fn toggle_style(&self) -> ClockSettings {
        self.apply(StateStore::toggle_style).await
    }

    pub async fn toggle_24h(&self) -> ClockSettings {
        self.apply(StateStore::toggle_24h).await
    }

    /// Also changes the ticker cadence.
    pub async fn toggle_seconds(&self) -> ClockSettings {
        self.apply(StateStore::toggle_seconds).await
    }

    /// Discards the stored document and reinstates the default.
    pub async fn reset(&self) {
        let snapshot = {
            let mut store = self.store.write().await;
            store.reset();
            Arc::new(store.state().clone())
        };
        self.state_event_sender
            .send(StateEvent::Reset(snapshot))
            .ok();
        self.sync_ticker().await;
    }

    /// Looks a city up by id. `None` is an ordinary outcome.
    pub async fn find_city(&self, id: &CityId) -> Option<City> {
        self.store.read().await.find_city(id).cloned()
    }

    /// Attaches a view. The ticker starts with the first attached view.
    pub async fn attach_view(&self, kind: ViewKind) -> ViewId {
        let id = self.views.write().await.insert(ClockView::new(kind));
        self.system_event_sender
            .send(SystemEvent::ViewAttached { id })
            .ok();
        self.sync_ticker().await;
        id
    }

    /// Detaches a view. The ticker stops with the last one.
    ///
    /// Returns `true` if the view was found and removed.
    pub async fn detach_view(&self, id: ViewId) -> bool {
        let was_removed = self.views.write().await.remove(id).is_some();
        if was_removed {
            self.system_event_sender
                .send(SystemEvent::ViewDetached { id })
                .ok();
            self.sync_ticker().await;
        }
        was_removed
    }

    /// The cadence of the running ticker, if any.
    pub async fn active_interval(&self) -> Option<Duration> {
        self.ticker.lock().await.as_ref().map(TickerGuard::interval)
    }

    /// Renders every attached view for the current instant, without a tick.
    ///
    /// Frames are broadcast as well as returned.
    pub async fn render_now(&self) -> Vec<Arc<ClockFrame>> {
        self.render_views(&TickEvent::now(0)).await
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `StateEvent` stream.
    pub fn subscribe_state_events(&self) -> broadcast::Receiver<StateEvent> {
        self.state_event_sender.subscribe()
    }

    /// Subscribes to rendered frames.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Arc<ClockFrame>> {
        self.frame_sender.subscribe()
    }

    /// Subscribes to the raw tick stream.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<Arc<TickEvent>> {
        self.tick_sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::components::view::FrameContent;
    use crate::time::RecordingScheduler;

    fn engine_with(scheduler: Arc<RecordingScheduler>) -> WorldClockEngine {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = StateStore::open(storage, "wc-state", default_state());
        WorldClockEngine::new(WorldClockConfig::default(), store, scheduler)
    }

    #[tokio::test]
    async fn ticker_follows_views_and_seconds_setting() {
        let scheduler = Arc::new(RecordingScheduler::new());
        let engine = engine_with(scheduler.clone());
        assert_eq!(engine.active_interval().await, None);

        let view = engine.attach_view(ViewKind::Overview).await;
        assert_eq!(engine.active_interval().await, Some(Duration::from_millis(1000)));

        engine.toggle_seconds().await;
        assert_eq!(engine.active_interval().await, Some(Duration::from_millis(60_000)));

        // A second view at the same cadence does not restart the ticker.
        let other = engine.attach_view(ViewKind::Overview).await;
        assert!(engine.detach_view(other).await);
        assert_eq!(
            scheduler.started(),
            vec![Duration::from_millis(1000), Duration::from_millis(60_000)]
        );

        assert!(engine.detach_view(view).await);
        assert_eq!(engine.active_interval().await, None);
        assert!(!engine.detach_view(view).await);
    }

    #[tokio::test]
    async fn style_toggle_keeps_the_ticker() {
        let scheduler = Arc::new(RecordingScheduler::new());
        let engine = engine_with(scheduler.clone());
        engine.attach_view(ViewKind::Overview).await;
        engine.toggle_style().await;
        engine.toggle_24h().await;
        assert_eq!(scheduler.started().len(), 1);
    }

    #[tokio::test]
    async fn mutations_broadcast_state_events() {
        let engine = engine_with(Arc::new(RecordingScheduler::new()));
        let mut events = engine.subscribe_state_events();

        let id = engine
            .add_from_catalog(catalog::find("Oslo").unwrap())
            .await
            .unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, StateEvent::Replaced(_)));
        assert_eq!(event.state().cities.len(), 4);
        assert_eq!(engine.find_city(&id).await.unwrap().name, "Oslo");

        engine.reset().await;
        let event = events.recv().await.unwrap();
        assert!(matches!(event, StateEvent::Reset(_)));
        assert_eq!(event.state().cities.len(), 3);
    }

    #[tokio::test]
    async fn rejected_add_changes_nothing() {
        let engine = engine_with(Arc::new(RecordingScheduler::new()));
        let mut events = engine.subscribe_state_events();
        let err = engine
            .add_city(NewCity {
                name: "Atlantis".into(),
                tz: "Ocean/Atlantis".into(),
                continent: crate::images::Continent::Europe,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownZone(_)));
        assert_eq!(engine.state().await.cities.len(), 3);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn render_now_covers_every_view() {
        let engine = engine_with(Arc::new(RecordingScheduler::new()));
        let first = engine.state().await.cities[0].id.clone();
        engine.attach_view(ViewKind::Overview).await;
        engine.attach_view(ViewKind::Detail(first.clone())).await;
        engine.remove_city(&first).await;

        let frames = engine.render_now().await;
        assert_eq!(frames.len(), 2);
        assert!(frames
            .iter()
            .any(|f| matches!(&f.content, FrameContent::Overview(r) if r.len() == 2)));
        assert!(frames
            .iter()
            .any(|f| f.content == FrameContent::CityNotFound(first.clone())));
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_dispatches_frames_then_stops() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = StateStore::open(storage, "wc-state", default_state());
        let engine =
            WorldClockEngine::new(WorldClockConfig::default(), store, Arc::new(TokioScheduler));
        let mut frames = engine.subscribe_frames();
        let mut system = engine.subscribe_system_events();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let runner = engine.clone();
        let handle = tokio::spawn(async move {
            runner
                .run_until(async move {
                    stop_rx.await.ok();
                })
                .await
        });

        // Wait for the dispatcher before the ticker fires its first tick.
        assert!(matches!(
            system.recv().await.unwrap(),
            SystemEvent::EngineStarted { .. }
        ));
        engine.attach_view(ViewKind::Overview).await;
        let frame = frames.recv().await.unwrap();
        assert!(matches!(&frame.content, FrameContent::Overview(r) if r.len() == 3));

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(engine.active_interval().await, None);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn view_attached_before_run_gets_the_first_tick() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let store = StateStore::open(storage, "wc-state", default_state());
        let engine =
            WorldClockEngine::new(WorldClockConfig::default(), store, Arc::new(TokioScheduler));
        let mut frames = engine.subscribe_frames();

        // Same order as the binary: per-minute cadence, attach, then run.
        engine.toggle_seconds().await;
        engine.attach_view(ViewKind::Overview).await;
        let started = tokio::time::Instant::now();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let runner = engine.clone();
        let handle = tokio::spawn(async move {
            runner
                .run_until(async move {
                    stop_rx.await.ok();
                })
                .await
        });

        let frame = frames.recv().await.unwrap();
        assert_eq!(frame.tick_count, 1);
        assert!(started.elapsed() < Duration::from_secs(60));

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
