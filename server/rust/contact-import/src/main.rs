use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use k1s0_contact_import_server::adapter::handler::{self, AppState};
use k1s0_contact_import_server::adapter::repository::{
    ContactPostgresRepository, ImportJobPostgresRepository, InMemoryContactRepository,
    InMemoryImportJobRepository,
};
use k1s0_contact_import_server::domain::repository::{ContactRepository, ImportJobRepository};
use k1s0_contact_import_server::infrastructure::config::Config;
use k1s0_contact_import_server::infrastructure::job_pool::JobPool;
use k1s0_contact_import_server::infrastructure::logger::init_logger;
use k1s0_contact_import_server::usecase;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // Logger
    init_logger(&cfg.app.environment, &cfg.logging.format);

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting contact import server"
    );

    // Database pool (optional)
    let db_pool = if let Some(ref db_config) = cfg.database {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| db_config.connection_url());
        info!("connecting to database");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .connect(&url)
            .await?;
        info!("database connection pool established");
        Some(pool)
    } else if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(25)
            .connect(&url)
            .await?;
        info!("database connection pool established from DATABASE_URL");
        Some(pool)
    } else {
        info!("no database configured, using in-memory repositories");
        None
    };

    if let Some(ref pool) = db_pool {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("database migrations applied");
    }

    // Repositories
    let contact_repo: Arc<dyn ContactRepository> = if let Some(ref pool) = db_pool {
        Arc::new(ContactPostgresRepository::new(pool.clone()))
    } else {
        Arc::new(InMemoryContactRepository::new())
    };
    let job_repo: Arc<dyn ImportJobRepository> = if let Some(ref pool) = db_pool {
        Arc::new(ImportJobPostgresRepository::new(pool.clone()))
    } else {
        Arc::new(InMemoryImportJobRepository::new())
    };

    let import_cfg = cfg.import.clone();
    let pool = Arc::new(JobPool::new(import_cfg.max_concurrent_jobs_per_tenant));

    // Use cases
    let state = AppState {
        preview_import_uc: Arc::new(usecase::PreviewImportUseCase::new(import_cfg.clone())),
        start_import_uc: Arc::new(usecase::StartImportUseCase::new(
            contact_repo,
            job_repo.clone(),
            pool.clone(),
            import_cfg.clone(),
        )),
        get_import_job_uc: Arc::new(usecase::GetImportJobUseCase::new(job_repo.clone())),
        cancel_import_job_uc: Arc::new(usecase::CancelImportJobUseCase::new(
            job_repo,
            pool.clone(),
        )),
        max_body_bytes: import_cfg.max_file_size_bytes(),
    };

    // Router
    let app = handler::router(state);

    // REST server
    let rest_addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
    info!("REST server starting on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let live = pool.live_jobs().await;
    if live > 0 {
        warn!(live_jobs = live, "shutting down with import jobs still running");
    }
    info!("contact import server exited");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
