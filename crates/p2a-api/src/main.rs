//! P2A 계정/인증 API 서버.
//!
//! 설정을 읽어 저장소, 메일 전송기, 해셔, JWT 발급기를 조립하고
//! Axum REST API 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, Router};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use p2a_api::routes::create_api_router;
use p2a_api::services::AuthSettings;
use p2a_api::state::AppState;
use p2a_api::store::{AuthStore, MemoryAuthStore};
use p2a_api::{JwtIssuer, PasswordHasher, PgAuthStore};
use p2a_core::config::{AppConfig, ServerConfig};
use p2a_core::logging::{init_logging, LogConfig};

/// CORS 레이어 생성.
///
/// 허용 origin이 설정되어 있으면 해당 origin만 허용하고,
/// 비어 있으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = server
        .cors_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        warn!("CORS origins not set, allowing any origin (development mode)");
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        // 자격 증명은 origin이 지정된 경우에만 허용
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// 저장소 생성. DB URL이 없으면 인메모리 저장소를 사용합니다.
async fn create_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn AuthStore>, Option<sqlx::PgPool>)> {
    let Some(url) = &config.database.url else {
        warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
        return Ok((Arc::new(MemoryAuthStore::new()), None));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(url.expose_secret())
        .await
        .context("Failed to connect to database")?;
    info!("Connected to PostgreSQL successfully");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
    }

    Ok((Arc::new(PgAuthStore::new(pool.clone())), Some(pool)))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(cors_layer(server))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 로드 및 설정 검증
    let config = AppConfig::from_env().context("Invalid configuration")?;

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging")?;

    info!(app = %config.app.name, "Starting P2A API server...");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("소켓 주소 설정이 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요.")?;

    let (store, db_pool) = create_store(&config).await?;
    let notifier = p2a_notification::notifier_from_config(&config.mail, &config.app)
        .context("Failed to configure email notifier")?;
    let hasher = PasswordHasher::from_config(&config.password)
        .context("Invalid password hashing parameters")?;
    let jwt = JwtIssuer::from_config(&config.jwt)?;
    let settings = AuthSettings {
        refresh_ttl: config.jwt.refresh_ttl()?,
        email_verification_ttl: config.email_verification_ttl(),
    };

    let mut state = AppState::new(store, notifier, hasher, jwt, settings)
        .with_trusted_proxy(config.server.trust_proxy_headers);
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }
    let state = Arc::new(state);

    info!(
        version = %state.version,
        has_db = state.db_pool.is_some(),
        notifier = %state.notifier_name,
        "Application state initialized"
    );

    let app = create_router(state, &config.server);

    info!(%addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기 (Ctrl+C 또는 SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
