pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod relay;
pub mod schema;
pub mod sync;

use std::error::Error;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{AdminService, AssignmentService, DeliveryService, OrderService, PaymentService};
use config::AppConfig;
use domain::ports::Store;
use handlers::ApiDoc;
use relay::ChangeRelay;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Services shared by every worker. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub assignments: AssignmentService,
    pub deliveries: DeliveryService,
    pub payments: PaymentService,
    pub admin: AdminService,
    pub relay: ChangeRelay,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, relay: ChangeRelay, config: &AppConfig) -> Self {
        let assignments =
            AssignmentService::new(store.clone(), relay.clone(), config.assignment_policy);
        AppState {
            orders: OrderService::new(
                store.clone(),
                relay.clone(),
                config.checkout.clone(),
                config.payu.clone(),
                config.app_url.clone(),
            ),
            deliveries: DeliveryService::new(store.clone(), relay.clone()),
            payments: PaymentService::new(
                store.clone(),
                relay.clone(),
                assignments.clone(),
                config.payu.clone(),
            ),
            admin: AdminService::new(store, relay.clone()),
            assignments,
            relay,
        }
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
