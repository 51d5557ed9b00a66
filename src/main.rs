use std::process::ExitCode;

use dotenvy::dotenv;

use stockroom::{
    config::Config,
    create_router,
    database::create_database_pool,
    schema::ensure_schema,
    Repository,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Any storage problem here is fatal: the share must be reachable and the
    // schema current before the first request is served.
    let db = create_database_pool(&config.database_path, config.busy_timeout).await?;
    ensure_schema(&db).await?;

    let app = create_router(Repository::new(db));

    let addr = config.listen_addr();
    log::info!("Stockroom server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
