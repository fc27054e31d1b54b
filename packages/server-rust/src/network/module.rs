//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. Between `start()` and
//! `serve()` the caller knows the bound port (useful with port 0).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    calculator_health, clear_history, fetch_history, get_log_level, health_handler,
    independent_calculate, liveness_handler, pop_arguments, push_arguments, readiness_handler,
    set_log_level, stack_operate, stack_size, AppState,
};
use super::middleware::{build_http_layers, track_requests};
use super::shutdown::ShutdownController;
use crate::service::ServiceStack;
use crate::telemetry::LogLevels;

/// Assembles the axum router with all routes and middleware.
///
/// API routes (`/calculator/...`, `/logs/level`) pass through the request
/// logger; health probes do not, so they keep answering while draining.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/calculator/health", get(calculator_health))
        .route(
            "/calculator/independent/calculate",
            post(independent_calculate),
        )
        .route("/calculator/stack/size", get(stack_size))
        .route(
            "/calculator/stack/arguments",
            put(push_arguments).delete(pop_arguments),
        )
        .route("/calculator/stack/operate", get(stack_operate))
        .route(
            "/calculator/history",
            get(fetch_history).delete(clear_history),
        )
        .route("/logs/level", get(get_log_level).put(set_log_level))
        .route_layer(from_fn_with_state(state.clone(), track_requests));

    let probes = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler));

    let layers = build_http_layers(&state.config);

    api.merge(probes).layer(layers).with_state(state)
}

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    services: ServiceStack,
    log_levels: Arc<LogLevels>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, services: ServiceStack, log_levels: Arc<LogLevels>) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            services,
            log_levels,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    ///
    /// Triggering shutdown on it stops `serve()` just like the external
    /// shutdown future does.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    fn app_state(&self) -> AppState {
        AppState::new(
            self.services.clone(),
            Arc::clone(&self.shutdown),
            Arc::new(self.config.clone()),
            Arc::clone(&self.log_levels),
        )
    }

    /// Builds the router over this module's shared state.
    pub fn router(&self) -> Router {
        build_router(self.app_state())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured
    /// port when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves or the shutdown controller
    /// is triggered.
    ///
    /// After the signal the health state moves to Draining (new API
    /// requests get 503), open connections finish, and in-flight requests
    /// get up to `drain_timeout` before the state moves to Stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, TLS material
    /// cannot be loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.router();
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };
        let shutdown_ctrl = self.shutdown;
        let config = self.config;

        let signal = {
            let ctrl = Arc::clone(&shutdown_ctrl);
            async move {
                tokio::select! {
                    () = shutdown => {}
                    () = ctrl.wait_for_signal() => {}
                }
                ctrl.trigger_shutdown();
            }
        };

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = config.tls {
            serve_tls(listener, router, tls_config, signal).await?;
        } else {
            info!("Serving plain HTTP connections");
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await?;
        }

        drain(&shutdown_ctrl, config.drain_timeout).await;
        Ok(())
    }
}

/// Serves TLS connections using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener by converting it to a `std::net::TcpListener`.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        signal.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

/// Waits for in-flight requests and moves to Stopped.
async fn drain(shutdown_ctrl: &ShutdownController, timeout: Duration) {
    shutdown_ctrl.trigger_shutdown();
    if shutdown_ctrl.wait_for_drain(timeout).await {
        info!("All in-flight requests drained");
    } else {
        warn!(
            in_flight = shutdown_ctrl.in_flight_count(),
            "Drain timeout expired with in-flight requests remaining"
        );
    }
}
