//! Application context - dependency injection container

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use shuttlelink_core::{
    EtaEngine, LocationSource, StreamForwarder, SyncEngine, SyncRecordRepository, TrackingOptions,
    TrackingSession, VehicleLocationStore,
};
use shuttlelink_domain::{Config, RecordKind, Result, ShuttleError};
use shuttlelink_infra::observability::metrics::SyncMetrics;
use shuttlelink_infra::{
    ChannelLocationSource, DbManager, HaversineRouteEstimator, HttpRemoteAuthority,
    ReplayLocationSource, SqliteSyncRecordRepository, StaticSessionContext, SyncScheduler, SyncSchedulerConfig,
    WebSocketChannel,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

const LOCATION_BUFFER: usize = 64;
const START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub repositories: BTreeMap<RecordKind, Arc<SqliteSyncRecordRepository>>,

    // Live tracking. `location_source` takes host-pushed samples; it is not
    // read while a recorded track is replaying.
    pub location_source: Arc<ChannelLocationSource>,
    pub session_context: Arc<StaticSessionContext>,
    pub realtime: Arc<WebSocketChannel>,
    pub tracking: Arc<TrackingSession>,
    pub store: VehicleLocationStore,

    // Sync and ETA
    pub sync_engine: Arc<SyncEngine>,
    pub sync_metrics: Arc<SyncMetrics>,
    pub sync_scheduler: Mutex<SyncScheduler>,
    pub eta: EtaEngine,
}

impl AppContext {
    /// Build the context from environment or config file.
    pub async fn new() -> Result<Self> {
        let config = shuttlelink_infra::config::load()?;
        Self::new_with_config(config).await
    }

    /// Build the context from an explicit configuration. Nothing is started;
    /// see [`start_background`](Self::start_background).
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let repositories: BTreeMap<_, _> = SqliteSyncRecordRepository::for_all_kinds(&db)
            .into_iter()
            .map(|repo| (repo.kind(), repo))
            .collect();

        let location_source = Arc::new(ChannelLocationSource::new(LOCATION_BUFFER));
        let tracked_source: Arc<dyn LocationSource> = match &config.tracking.replay_file {
            Some(path) => {
                let replay = ReplayLocationSource::from_json_file(
                    path,
                    Duration::from_millis(config.tracking.replay_interval_ms),
                )?
                .looping(config.tracking.replay_loop);
                info!(path = %path, samples = replay.len(), "Replaying recorded track");
                Arc::new(replay)
            }
            None => location_source.clone(),
        };
        let session_context = Arc::new(StaticSessionContext::from_config(&config.tracking));
        let realtime = Arc::new(WebSocketChannel::from_config(&config.realtime)?);
        let forwarder = Arc::new(StreamForwarder::new(
            realtime.clone(),
            Duration::from_millis(config.realtime.send_timeout_ms),
        ));
        let store = VehicleLocationStore::new();
        let tracking = Arc::new(TrackingSession::new(
            tracked_source,
            session_context.clone(),
            forwarder,
            store.clone(),
            TrackingOptions::from(&config.tracking),
        ));

        let remote = Arc::new(HttpRemoteAuthority::from_config(&config.remote)?);
        let sync_engine = Arc::new(repositories.values().fold(
            SyncEngine::from_config(remote, &config.sync),
            |engine, repo| engine.with_repository(repo.clone()),
        ));
        let sync_metrics = Arc::new(SyncMetrics::new());
        let sync_scheduler = SyncScheduler::new(
            Arc::clone(&sync_engine),
            SyncSchedulerConfig::from(&config.sync),
            Arc::clone(&sync_metrics),
        );

        let eta = EtaEngine::new(Arc::new(HaversineRouteEstimator::new(&config.eta)?));

        info!(db_path = %db.path().display(), realtime = realtime.url(), "application context ready");

        Ok(Self {
            config,
            db,
            repositories,
            location_source,
            session_context,
            realtime,
            tracking,
            store,
            sync_engine,
            sync_metrics,
            sync_scheduler: Mutex::new(sync_scheduler),
            eta,
        })
    }

    /// Whether tracking reads a recorded track instead of `location_source`.
    pub fn is_replaying(&self) -> bool {
        self.config.tracking.replay_file.is_some()
    }

    /// Repository for `kind`.
    pub fn repository(&self, kind: RecordKind) -> Result<&Arc<SqliteSyncRecordRepository>> {
        self.repositories
            .get(&kind)
            .ok_or_else(|| ShuttleError::Internal(format!("no repository registered for {kind}")))
    }

    /// Start the sync scheduler and tracking session as configured.
    pub async fn start_background(&self) -> Result<()> {
        if self.config.sync.enabled {
            let mut scheduler = self.sync_scheduler.lock().await;
            tokio::time::timeout(START_TIMEOUT, scheduler.start())
                .await
                .map_err(|_| ShuttleError::Internal("SyncScheduler start timed out".into()))??;
        }

        if self.config.tracking.enabled {
            self.tracking.start().await?;
        }
        Ok(())
    }

    /// Stop everything started by [`start_background`](Self::start_background).
    pub async fn shutdown(&self) -> Result<()> {
        self.tracking.stop().await;

        let mut scheduler = self.sync_scheduler.lock().await;
        if scheduler.is_running() {
            if let Err(err) = scheduler.stop().await {
                warn!(error = %err, "sync scheduler did not stop cleanly");
                return Err(err.into());
            }
        }

        info!("application context shut down");
        Ok(())
    }
}
