use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::IntoResponse,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use minutes_backend::{
    config::{Config, LogFormat},
    db::{
        postgres_activity_repository::PostgresActivityRepository,
        postgres_audit_log_repository::PostgresAuditLogRepository,
        postgres_identity_repository::PostgresIdentityRepository,
        postgres_invitation_repository::PostgresInvitationRepository,
        postgres_user_repository::PostgresUserRepository,
        postgres_workspace_repository::PostgresWorkspaceRepository,
    },
    responses::JsonResponse,
    routes::api_router,
    services::smtp_mailer::SmtpMailer,
    utils::jwt::JwtKeys,
    AppState,
};

#[cfg(feature = "tls")]
use axum_server::tls_rustls::RustlsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });
    init_tracing(config.log_format);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.per_millisecond)
            .burst_size(config.rate_limit.burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    // Periodically drop idle client keys from the limiter.
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let pool = establish_connection(&config.database_url).await?;

    let smtp = config
        .smtp
        .as_ref()
        .context("SMTP_HOST and SMTP_FROM must be set to send invitations")?;
    let mailer = SmtpMailer::new(smtp).context("failed to initialize mailer")?;
    let jwt_keys = JwtKeys::from_secret(&config.jwt_secret).context("invalid JWT_SECRET")?;

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid origin")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("BIND_ADDR {} is not a socket address", config.bind_addr))?;

    let state = AppState {
        workspace_repo: Arc::new(PostgresWorkspaceRepository { pool: pool.clone() }),
        user_repo: Arc::new(PostgresUserRepository { pool: pool.clone() }),
        invitation_repo: Arc::new(PostgresInvitationRepository { pool: pool.clone() }),
        identity_repo: Arc::new(PostgresIdentityRepository { pool: pool.clone() }),
        activity_repo: Arc::new(PostgresActivityRepository { pool: pool.clone() }),
        audit_repo: Arc::new(PostgresAuditLogRepository { pool }),
        mailer: Arc::new(mailer),
        config: Arc::new(config),
        jwt_keys: Arc::new(jwt_keys),
    };

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    #[cfg(feature = "tls")]
    {
        let tls_config = RustlsConfig::from_pem_file(
            std::env::var("DEV_CERT_LOCATION").context("DEV_CERT_LOCATION must be set")?,
            std::env::var("DEV_KEY_LOCATION").context("DEV_KEY_LOCATION must be set")?,
        )
        .await
        .context("failed to load TLS certs")?;

        info!(%addr, "listening with TLS");
        axum_server::bind_rustls(addr, tls_config)
            .serve(make_service)
            .await?;
        return Ok(());
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, make_service).await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "minutes_backend=info,tower_http=info".into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(sentry_tracing::layer());

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}
