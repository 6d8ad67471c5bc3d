use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use gatehouse_auth::{
    AuthError, GateState, InMemoryUserDirectory, LoginAttemptGuard, LoginService, NewUser, RoleAllowList,
    TokenService, UserDirectory, authorization_gate, require_roles,
};
use gatehouse_cache::{CacheStore, create_cache_store};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub login: Arc<LoginService>,
}

pub struct GatehouseServer {
    addr: SocketAddr,
    app: Router,
}

/// Builds the router over an existing cache store and user directory.
pub async fn build_app_with(
    cfg: &AppConfig,
    store: Arc<dyn CacheStore>,
    directory: Arc<dyn UserDirectory>,
) -> anyhow::Result<Router> {
    let tokens = Arc::new(TokenService::new(&cfg.auth.signing_key, cfg.auth.token_lifetime));
    let guard = Arc::new(LoginAttemptGuard::new(store, cfg.auth.lockout.policy()));
    let login = Arc::new(LoginService::new(directory, guard, tokens.clone()));

    for user in &cfg.bootstrap.users {
        let new_user = NewUser {
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            password: user.password.clone(),
        };
        match login.provision(new_user, &user.role).await {
            Ok(record) => {
                tracing::info!(email = %record.email, role = %record.role, "Bootstrap user created");
            }
            Err(AuthError::EmailTaken) => {
                tracing::debug!(email = %user.email, "Bootstrap user already exists");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let gate = GateState::new(tokens, cfg.auth.public_paths.iter().cloned());
    Ok(router(AppState { login }, gate, cfg))
}

/// Builds the router with the configured cache store and an in-memory directory.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let store = create_cache_store(&cfg.cache).await?;
    build_app_with(cfg, store, Arc::new(InMemoryUserDirectory::new())).await
}

fn router(state: AppState, gate: GateState, cfg: &AppConfig) -> Router {
    let user_routes = Router::new()
        .route("/users/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(
            RoleAllowList::new(["user", "admin"]),
            require_roles,
        ));

    let admin_routes = Router::new()
        .route("/admin/ping", get(handlers::admin_ping))
        .route_layer(middleware::from_fn_with_state(
            RoleAllowList::new(["admin"]),
            require_roles,
        ));

    let superadmin_routes = Router::new()
        .route("/admin/lockouts/{principal}", delete(handlers::clear_lockout))
        .route_layer(middleware::from_fn_with_state(
            RoleAllowList::new(Vec::<String>::new()),
            require_roles,
        ));

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .merge(user_routes)
        .merge(admin_routes)
        .merge(superadmin_routes)
        .with_state(state)
        // Middleware stack (order: gate -> timeout -> trace -> body limit)
        .layer(middleware::from_fn_with_state(gate, authorization_gate))
        .layer(TimeoutLayer::new(cfg.server.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<GatehouseServer> {
        let app = build_app(&self.config).await?;
        Ok(GatehouseServer {
            addr: self.config.addr(),
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatehouseServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
