use std::io;
use std::sync::Arc;

use order_lifecycle::config::AppConfig;
use order_lifecycle::infrastructure::DieselStore;
use order_lifecycle::relay::ChangeRelay;
use order_lifecycle::{build_server, create_pool, run_migrations, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    if config.payu.is_none() {
        log::warn!("PAYU_MERCHANT_KEY / PAYU_SALT not set, pay-now checkout is disabled");
    }

    let state = AppState::new(
        Arc::new(DieselStore::new(pool)),
        ChangeRelay::new(),
        &config,
    );

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
