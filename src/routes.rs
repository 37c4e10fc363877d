use actix_web::{error::JsonPayloadError, web, Error, HttpRequest, HttpResponse, Responder, Scope};

use crate::auth::{login, register};
use crate::error::ApiError;
use crate::middleware::Authentication;
use crate::schedule::{create_schedule, delete_schedule, read_schedules, update_schedule};

pub async fn welcome() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "msg": "Welcome to the scheduling API" }))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    ApiError::Validation(format!("Invalid request body: {}", err)).into()
}

// Registration and login live under both prefixes.
fn account_scope(prefix: &str) -> Scope {
    web::scope(prefix)
        .route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/", web::get().to(welcome))
        .service(account_scope("/user"))
        .service(account_scope("/auth"))
        .service(
            web::scope("/schedule")
                .wrap(Authentication)
                .route("/read/{user_id}", web::get().to(read_schedules))
                .route("/create/{user_id}", web::post().to(create_schedule))
                .route("/update/{id}", web::put().to(update_schedule))
                .route("/delete/{id}", web::delete().to(delete_schedule)),
        );
}
