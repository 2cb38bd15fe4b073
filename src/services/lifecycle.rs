// src/services/lifecycle.rs
// DOCUMENTATION: Process startup and graceful shutdown
// PURPOSE: Enforce config -> pool -> diagnostics -> serving on the way up
// and the reverse order on the way down

use crate::config::{init_db_pool, Config, DbPool};
use crate::errors::{ShutdownTimeout, StartupError};
use crate::handlers;
use crate::middleware::{enable_cors, rate_limit};
use crate::services::{start_cleanup_task, ClientRateLimiter, Diagnostics, TaskTracker};
use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;

/// How often idle rate limiter buckets are dropped
const LIMITER_CLEANUP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Initializing,
    PoolReady,
    Serving,
    Draining,
    Terminated,
}

impl LifecycleState {
    fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Initializing, PoolReady)
                | (Initializing, Terminated)
                | (PoolReady, Serving)
                | (PoolReady, Terminated)
                | (Serving, Draining)
                | (Draining, Terminated)
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("illegal lifecycle transition from {from:?} to {to:?}")]
pub struct IllegalTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Observable process state
/// DOCUMENTATION: Clones share state; `subscribe` lets collaborators react
/// to `Draining` without polling.
#[derive(Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Initializing);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn advance(&self, next: LifecycleState) -> Result<(), IllegalTransition> {
        let mut result = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_advance_to(next) {
                log::info!("Lifecycle: {:?} -> {:?}", current, next);
                *current = next;
                true
            } else {
                result = Err(IllegalTransition {
                    from: *current,
                    to: next,
                });
                false
            }
        });
        result
    }

    /// Record a fatal startup failure
    fn abort(&self) {
        if let Err(e) = self.advance(LifecycleState::Terminated) {
            log::warn!("{}", e);
        }
    }
}

/// Everything the service needs once the pool is validated
pub struct Application {
    config: Arc<Config>,
    pool: DbPool,
    tracker: TaskTracker,
    diagnostics: Arc<Diagnostics>,
    lifecycle: Lifecycle,
}

impl Application {
    /// Initializing -> PoolReady
    /// DOCUMENTATION: Any failure leaves the lifecycle `Terminated` and is
    /// returned for the caller to log and exit on.
    pub async fn bootstrap(config: Config) -> Result<Self, StartupError> {
        let lifecycle = Lifecycle::new();

        let pool = match init_db_pool(&config).await {
            Ok(pool) => pool,
            Err(e) => {
                lifecycle.abort();
                return Err(e);
            }
        };

        Ok(Self::with_pool(Arc::new(config), pool, lifecycle))
    }

    fn with_pool(config: Arc<Config>, pool: DbPool, lifecycle: Lifecycle) -> Self {
        if let Err(e) = lifecycle.advance(LifecycleState::PoolReady) {
            log::warn!("{}", e);
        }

        Self {
            config,
            pool,
            tracker: TaskTracker::new(Handle::current()),
            diagnostics: Arc::new(Diagnostics::new()),
            lifecycle,
        }
    }

    #[cfg(test)]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// PoolReady -> Serving -> Draining -> Terminated
    /// DOCUMENTATION: Publishes diagnostics, binds the listener and serves
    /// until `shutdown` resolves. Only a bind failure is an error; drain
    /// timeouts are logged as warnings.
    pub async fn serve_until<S>(self, shutdown: S) -> Result<(), StartupError>
    where
        S: Future<Output = ()>,
    {
        let Application {
            config,
            pool,
            tracker,
            diagnostics,
            lifecycle,
        } = self;

        diagnostics.publish_defaults(&pool, &tracker, Handle::current());

        let limiter = Arc::new(ClientRateLimiter::from_config(&config.limiter));
        let addr = config.bind_address();
        let grace = config.shutdown_timeout;

        let config_data = web::Data::from(config.clone());
        let diagnostics_data = web::Data::from(diagnostics);
        let limiter_data = web::Data::from(limiter.clone());
        let pool_data = web::Data::new(pool.clone());
        let tracker_data = web::Data::new(tracker.clone());

        let server = HttpServer::new(move || {
            App::new()
                // Application state
                .app_data(config_data.clone())
                .app_data(diagnostics_data.clone())
                .app_data(limiter_data.clone())
                .app_data(pool_data.clone())
                .app_data(tracker_data.clone())
                // Middleware
                .wrap(from_fn(rate_limit))
                .wrap(from_fn(enable_cors))
                .wrap(Logger::default())
                // Routes
                .configure(handlers::health_config)
                .configure(handlers::debug_config)
                .default_service(web::route().to(handlers::not_found))
        })
        .disable_signals()
        .shutdown_timeout(http_shutdown_secs(grace))
        .bind(&addr);

        let server = match server {
            Ok(server) => server,
            Err(source) => {
                lifecycle.abort();
                pool.close().await;
                return Err(StartupError::Bind { addr, source });
            }
        };

        for bound in server.addrs() {
            log::info!("Starting server on {} (env: {})", bound, config.environment);
        }

        let server = server.run();
        let server_handle = server.handle();
        let mut server_task = actix_rt::spawn(server);
        start_cleanup_task(
            limiter,
            LIMITER_CLEANUP_INTERVAL_SECS,
            &tracker,
            lifecycle.subscribe(),
        );
        if let Err(e) = lifecycle.advance(LifecycleState::Serving) {
            log::warn!("{}", e);
        }

        tokio::select! {
            joined = &mut server_task => {
                match joined {
                    Ok(Ok(())) => log::warn!("HTTP server stopped without a shutdown signal"),
                    Ok(Err(e)) => log::error!("HTTP server failed: {}", e),
                    Err(e) => log::error!("HTTP server task aborted: {}", e),
                }
            }
            _ = shutdown => {
                log::info!("Shutdown signal received");
            }
        }

        if let Err(e) = lifecycle.advance(LifecycleState::Draining) {
            log::warn!("{}", e);
        }

        // In-flight requests and background work share one grace period
        let deadline = Instant::now() + grace;

        if tokio::time::timeout_at(deadline, server_handle.stop(true))
            .await
            .is_err()
        {
            log::warn!("In-flight requests still open after {:?}", grace);
        }
        log::info!("Listener stopped; waiting for background tasks");

        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Err(warning) = drain_and_release(&tracker, remaining, pool).await {
            log::warn!("{}", ShutdownTimeout { grace, ..warning });
        }

        if let Err(e) = lifecycle.advance(LifecycleState::Terminated) {
            log::warn!("{}", e);
        }
        log::info!("Stopped server on {}", addr);

        Ok(())
    }
}

/// actix takes whole seconds; round up so a sub-second grace is not zero
fn http_shutdown_secs(grace: Duration) -> u64 {
    grace.as_secs() + u64::from(grace.subsec_nanos() > 0)
}

/// Draining -> Terminated
/// DOCUMENTATION: Waits up to `grace` for tracked work, then closes the pool
/// whether or not the wait completed.
pub async fn drain_and_release(
    tracker: &TaskTracker,
    grace: Duration,
    pool: DbPool,
) -> Result<(), ShutdownTimeout> {
    let drained = tracker.wait_drain(grace).await;

    if drained.is_ok() {
        log::info!("Background tasks drained (0 outstanding)");
    }

    pool.close().await;
    drained
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => log::info!("Received SIGTERM"),
    }
}
