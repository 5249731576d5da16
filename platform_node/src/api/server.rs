use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderMap, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::api::errors::{ApiError, ApiResult};
use crate::api::handlers::{
    analytics, bounties, community, debug, media, profile, search, status, submissions, sync,
};
use crate::api::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::common::Error;
use crate::config::Config;
use crate::integrations::{
    AirtableClient, AssetHost, BountyStore, CloudinaryClient, IdentityProvider, PrivyClient,
};
use crate::search::SearchAnalytics;
use crate::submission::{InFlightSubmissions, SubmissionPipeline};
use crate::sync::SyncTracker;

const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

// Application State
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Option<Arc<dyn BountyStore>>,
    pub assets: Option<Arc<dyn AssetHost>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub analytics: Arc<RwLock<SearchAnalytics>>,
    pub sync: Arc<RwLock<SyncTracker>>,
    pub in_flight: InFlightSubmissions,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State with no integrations wired in.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            store: None,
            assets: None,
            identity: None,
            analytics: Arc::new(RwLock::new(SearchAnalytics::default())),
            sync: Arc::new(RwLock::new(SyncTracker::new())),
            in_flight: InFlightSubmissions::default(),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
        }
    }

    /// Build the HTTP clients for every integration that has credentials.
    pub fn from_config(config: Config) -> crate::common::Result<Self> {
        let timeout = config.http_timeout;

        let store = match config.airtable.clone() {
            Some(c) => Some(Arc::new(AirtableClient::new(c, timeout)?) as Arc<dyn BountyStore>),
            None => None,
        };
        let assets = match config.cloudinary.clone() {
            Some(c) => Some(Arc::new(CloudinaryClient::new(c, timeout)?) as Arc<dyn AssetHost>),
            None => None,
        };
        let identity = match config.privy.clone() {
            Some(c) => Some(Arc::new(PrivyClient::new(c, timeout)?) as Arc<dyn IdentityProvider>),
            None => None,
        };

        Ok(Self {
            store,
            assets,
            identity,
            ..Self::new(config)
        })
    }

    pub fn with_store(mut self, store: Arc<dyn BountyStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetHost>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_rate_limits(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(config));
        self
    }

    pub fn store(&self) -> ApiResult<&dyn BountyStore> {
        self.store
            .as_deref()
            .ok_or_else(|| Error::NotConfigured { service: "Airtable" }.into())
    }

    pub fn identity(&self) -> ApiResult<&dyn IdentityProvider> {
        self.identity
            .as_deref()
            .ok_or_else(|| Error::NotConfigured { service: "Privy" }.into())
    }

    pub fn pipeline(&self) -> ApiResult<SubmissionPipeline<'_>> {
        Ok(SubmissionPipeline {
            store: self.store()?,
            assets: self.assets.as_deref(),
            limits: self.config.upload_limits,
            in_flight: &self.in_flight,
        })
    }

    pub fn admin_authorized(&self, headers: &HeaderMap) -> bool {
        match (&self.config.admin_api_key, headers.get(ADMIN_KEY_HEADER)) {
            (Some(expected), Some(given)) => given.as_bytes().ct_eq(expected.as_bytes()).into(),
            _ => false,
        }
    }

    /// Admin key check for routes that are closed when no key is configured.
    pub fn require_admin(&self, headers: &HeaderMap) -> ApiResult<()> {
        if self.config.admin_api_key.is_none() {
            return Err(ApiError::service_unavailable("ADMIN_API_KEY is not configured"));
        }
        if !self.admin_authorized(headers) {
            return Err(ApiError::unauthorized("A valid x-admin-key header is required"));
        }
        Ok(())
    }

    /// Admin key check for routes that stay open until a key is configured.
    pub fn require_admin_if_configured(&self, headers: &HeaderMap) -> ApiResult<()> {
        if self.config.admin_api_key.is_some() && !self.admin_authorized(headers) {
            return Err(ApiError::unauthorized("A valid x-admin-key header is required"));
        }
        Ok(())
    }
}

/// Best-effort client address: first `x-forwarded-for` hop, then the peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = match &config.server.cors_allowed_origins {
        None => AllowOrigin::any(),
        Some(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", o);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any)
}

// API Router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.upload_limits.max_total_bytes + FORM_OVERHEAD_BYTES;
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        // Health
        .route("/health", get(status::health_check))
        // Bounties and search
        .route("/api/bounties", get(bounties::list_bounties))
        .route("/api/bounties/:id", get(bounties::get_bounty))
        .route("/api/search", get(search::search))
        // Submissions and uploads
        .route("/api/submissions", post(submissions::create_submission))
        .route("/api/submissions/check", get(submissions::check_submission))
        .route("/api/attachments", post(submissions::upload_attachments))
        .route("/api/cloudinary/signature", post(media::sign_upload))
        // Admin
        .route("/api/sync", post(sync::sync_bounties))
        .route("/api/analytics", get(analytics::search_analytics))
        // Profiles
        .route("/api/profile", patch(profile::update_profile))
        .route("/api/profile/:user_id", get(profile::get_profile))
        .route("/api/profile/:user_id/submissions", get(profile::get_user_submissions))
        // Community
        .route("/api/winners", get(community::list_winners))
        .route("/api/activities", get(community::list_activities))
        .route("/api/leaderboard", get(community::leaderboard))
        // Setup diagnostics
        .route("/api/debug/config", get(debug::config_report))
        .route("/api/debug/airtable", get(debug::airtable_probe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

// Server startup
pub async fn start_api_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config)?;

    info!(
        "Integrations: airtable={} cloudinary={} privy={}",
        state.store.is_some(),
        state.assets.is_some(),
        state.identity.is_some()
    );

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup_expired();
        }
    });

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Bounty platform API listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
