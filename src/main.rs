use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{rt, web, App, HttpServer};

use neotask::auth::{AuthMiddleware, SessionAuthenticator};
use neotask::config::Config;
use neotask::error::AppError;
use neotask::routes::{self, health};
use neotask::state::AppState;
use neotask::store::postgres;

fn startup_error(error: AppError) -> io::Error {
    log::error!("startup failed: {}", error);
    io::Error::new(io::ErrorKind::Other, error)
}

/// Purges expired sessions on a fixed interval for the life of the process.
fn spawn_session_sweep(sessions: Arc<SessionAuthenticator>, every: std::time::Duration) {
    rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => log::debug!("purged {} expired sessions", purged),
                Err(e) => log::warn!("session sweep failed: {}", e),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(startup_error)?;
    log::info!(
        "configuration: host={} port={} store={} token_ttl={}s session_ttl={}s jwt_secret=<redacted>",
        config.server_host,
        config.server_port,
        if config.database_url.is_some() { "postgres" } else { "memory" },
        config.token_ttl.num_seconds(),
        config.session_ttl.num_seconds(),
    );

    let state = match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url).await.map_err(startup_error)?;
            AppState::postgres(&config, pool)
        }
        None => {
            log::warn!("DATABASE_URL not set; data will not survive a restart");
            AppState::in_memory(&config)
        }
    }
    .map_err(startup_error)?;
    let state = web::Data::new(state);

    let sweep_every = config
        .session_sweep_interval
        .to_std()
        .map_err(|e| startup_error(AppError::InternalServerError(e.to_string())))?;
    spawn_session_sweep(Arc::clone(&state.sessions), sweep_every);

    log::info!("Starting neotask server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(Arc::clone(&state.gate)))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
