use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;

use crud_scaffold::app::AppState;
use crud_scaffold::auth::JwtKeys;
use crud_scaffold::config::{Config, Storage};

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let keys = JwtKeys::from_secret(&config.jwt_secret);

    let state = match (config.storage, config.database_url.as_deref()) {
        (Storage::Postgres, Some(database_url)) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(startup_error)?;
            sqlx::migrate!().run(&pool).await.map_err(startup_error)?;
            AppState::postgres(keys, pool)
        }
        (Storage::Postgres, None) => return Err(startup_error("DATABASE_URL must be set")),
        (Storage::Memory, _) => {
            log::warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(keys)
        }
    };

    log::info!("Starting server at {}", config.server_url());

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(move |cfg| state.configure(cfg))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
