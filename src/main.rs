// src/main.rs

mod app_state;
mod auth;
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod schedule;
mod store;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use crate::app_state::AppState;
use crate::db::MongoDB;
use crate::store::MongoStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().map_err(io::Error::other)?;
    let mongodb = MongoDB::init(&config.mongo_uri, &config.database_name)
        .await
        .map_err(io::Error::other)?;
    let store = Arc::new(
        MongoStore::init(&mongodb, config.conflict_scope)
            .await
            .map_err(io::Error::other)?,
    );
    let state = AppState::new(&config, store.clone(), store);

    let cors_origin = config.cors_origin.clone();
    info!("Server running at http://{}:{}", config.host, config.port);
    match &cors_origin {
        Some(origin) => info!("Allowed CORS Origin: {}", origin),
        None => info!("CORS is permissive"),
    }

    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    http::header::CONTENT_TYPE,
                    http::header::ACCEPT,
                    http::header::AUTHORIZATION,
                ])
                .max_age(3600),
            None => Cors::permissive(),
        };

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    mongodb.shutdown().await;
    Ok(())
}
