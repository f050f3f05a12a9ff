use mes::api;
use mes::config;
use mes::db;
use mes::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::Config::from_env()?;
    logging::init();

    tracing::info!(
        api = %cfg.api_addr,
        migrate_on_startup = cfg.migrate_on_startup,
        page_limit_max = cfg.page_limit_max,
        "mesd starting"
    );

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
    }

    // ---- API task ----
    let app = api::router(api::ApiState::new(pool.clone(), cfg.page_limit_max));
    let api_addr = cfg.api_addr.clone();

    let api_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        tracing::info!("api listening on http://{api_addr}");
        axum::serve(listener, app).await?;
        Ok::<(), anyhow::Error>(())
    });

    tokio::select! {
        res = api_handle => res??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
        }
    }

    pool.close().await;
    Ok(())
}
