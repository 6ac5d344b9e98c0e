use actix_web::{web, App, HttpServer};
use log::info;

use peer_chess::config::RelayConfig;
use peer_chess::models::AppState;
use peer_chess::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = RelayConfig::from_env();
    info!(
        "Starting chess relay at http://{}:{} (static files from {})",
        config.host,
        config.port,
        config.static_dir.display()
    );

    // Create shared application state
    let app_state = web::Data::new(AppState::new());
    let shared_config = web::Data::new(config.clone());
    let route_config = config.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(shared_config.clone())
            .configure(|cfg| configure_routes(cfg, &route_config))
    })
    .bind(config.bind_address())?
    .run()
    .await
}
