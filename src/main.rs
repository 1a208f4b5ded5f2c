use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::{Builder, Env};
use log::{error, info};

use twitter_web::auth::session_middleware;
use twitter_web::config::Config;
use twitter_web::service::Service;
use twitter_web::{configure, db};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting Twitter clone...");
    let config = Config::load().map_err(|e| {
        error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store = db::open_store(config.store, &config.scylla)
        .await
        .expect("Failed to create database session");
    let service = web::Data::new(Service::new(store, config.bcrypt_cost));
    let session_key = config.session_key.clone();
    let cookie_secure = config.cookie_secure;

    info!("Listening on {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(session_middleware(session_key.clone(), cookie_secure))
            .wrap(Logger::default())
            .configure(configure)
    })
    .workers(config.workers)
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
