use actix_files as fs;
use actix_web::{web, Either, HttpResponse, Responder};
use log::debug;

use crate::config::RelayConfig;

/// HTTP handler for the index page
pub async fn index(config: web::Data<RelayConfig>) -> impl Responder {
    let path = config.static_dir.join("index.html");
    match fs::NamedFile::open_async(&path).await {
        Ok(file) => Either::Left(file),
        Err(e) => {
            debug!("No index page at {}: {}", path.display(), e);
            Either::Right(HttpResponse::Ok().body("Chess relay"))
        }
    }
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig, config: &RelayConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/").route(web::get().to(index)))
        .service(fs::Files::new("/static", &config.static_dir));
}
