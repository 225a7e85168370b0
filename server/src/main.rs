mod auth;
mod config;
mod membership;
mod router;
mod sfu;
mod ws;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use config::Config;
use ember_calls::CallRegistry;
use ember_hub::{ConnectionLifecycle, Hub};
use ember_metrics::{MetricsConfig, MetricsServer};
use ember_repo::{PgRepo, SessionRepository};
use ember_services::{
    ChannelService, DmService, FriendService, MemberService, MessageService, P2pCallService, PresenceService, ReactionService, ReadStateService,
    VoiceService,
};
use ember_voice::VoiceStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::{AuthProvider, DevAuthProvider, SessionAuthProvider};
use crate::membership::RepoMembershipProvider;
use crate::router::AppRouter;
use crate::sfu::HmacSfuClient;

/// Everything the `/ws` upgrade handler needs directly. Every other service
/// lives behind the [`AppRouter`] or a [`ConnectionLifecycle`] hook instead,
/// since nothing outside the intent-dispatch path ever reaches them.
pub struct AppState {
    pub repo: Arc<PgRepo>,
    pub hub: Arc<Hub>,
    pub voice: Arc<VoiceService>,
    pub auth: Arc<dyn AuthProvider>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = Config::parse();

    let pool = PgPoolOptions::new().max_connections(32).connect(&cfg.database_url).await?;
    let repo = Arc::new(PgRepo::new(pool));

    let metrics_namespace: &'static str = Box::leak(cfg.metrics_namespace.clone().into_boxed_str());
    let metrics_server = MetricsServer::install(MetricsConfig { namespace: metrics_namespace })?;

    let membership = Arc::new(RepoMembershipProvider::new(repo.clone(), repo.clone(), repo.clone()));
    let hub = Hub::new(membership);

    let presence = Arc::new(PresenceService::new(repo.clone(), hub.clone()));

    let voice_store = Arc::new(VoiceStore::new());
    let sfu_client = Arc::new(HmacSfuClient::new(repo.clone()));
    let voice = Arc::new(VoiceService::new(voice_store, repo.clone(), repo.clone(), repo.clone(), repo.clone(), sfu_client, hub.clone()));

    let call_registry = Arc::new(CallRegistry::new());
    let calls = Arc::new(P2pCallService::new(call_registry, repo.clone(), hub.clone()));

    let friends = Arc::new(FriendService::new(repo.clone(), repo.clone(), hub.clone()));
    let members = Arc::new(MemberService::new(repo.clone(), repo.clone(), hub.clone()));
    let channels_admin = Arc::new(ChannelService::new(repo.clone(), repo.clone(), repo.clone(), hub.clone()));
    let messages = Arc::new(MessageService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone(), repo.clone(), hub.clone()));
    let reactions = Arc::new(ReactionService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone(), repo.clone(), hub.clone()));
    let dms = Arc::new(DmService::new(repo.clone(), repo.clone(), hub.clone()));
    let read_states = Arc::new(ReadStateService::new(repo.clone()));
    // Wired for future HTTP-surface use (not exercised by the WebSocket
    // intent set); kept alive here so the binary actually builds them.
    let _ = (members, channels_admin, messages, reactions, dms, read_states);

    hub.set_lifecycle_hooks(vec![presence as Arc<dyn ConnectionLifecycle>, voice.clone() as Arc<dyn ConnectionLifecycle>]);
    hub.set_intent_router(Arc::new(AppRouter {
        voice: voice.clone(),
        calls: calls.clone(),
        friends,
        channels: repo.clone(),
        roles: repo.clone(),
        servers: repo.clone(),
        dms: repo.clone(),
        hub: hub.clone(),
    }));

    let auth: Arc<dyn AuthProvider> = if cfg.dev_mode {
        Arc::new(DevAuthProvider)
    } else {
        Arc::new(SessionAuthProvider::new(repo.clone()))
    };

    let state = Arc::new(AppState { repo: repo.clone(), hub: hub.clone(), voice, auth });

    let sweep_calls = calls.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(cfg.call_sweep_interval_ms));
        loop {
            tick.tick().await;
            sweep_calls.sweep_expired_ringing().await;
        }
    });

    let sweep_repo = repo.clone();
    let session_sweep_interval_ms = cfg.session_sweep_interval_ms;
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(session_sweep_interval_ms));
        loop {
            tick.tick().await;
            match sweep_repo.delete_expired().await {
                Ok(count) if count > 0 => info!(count, "swept expired sessions"),
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "session sweep failed"),
            }
        }
    });

    let app = Router::new().route("/ws", get(ws::upgrade)).with_state(state).merge(metrics_server.route());

    let listener = tokio::net::TcpListener::bind(&cfg.listen).await?;
    info!(addr = %cfg.listen, "listening");

    tokio::select! {
        r = axum::serve(listener, app).into_future() => r?,
        _ = tokio::signal::ctrl_c() => info!("shutdown"),
    }

    Ok(())
}
