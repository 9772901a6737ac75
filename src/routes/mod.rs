pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::web;

use crate::error::AppError;

fn bad_request(message: String) -> actix_web::Error {
    log::debug!("rejected request: {}", message);
    AppError::BadRequest(message).into()
}

/// Mounts every `/api` route. The caller wraps the scope in `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| bad_request(err.to_string())),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| bad_request(err.to_string())),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _req| bad_request(err.to_string())),
    )
    .service(
        web::scope("/auth")
            .service(auth::signup)
            .service(auth::login)
            .service(auth::session_login)
            .service(auth::logout)
            .service(auth::me),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::toggle_task)
            .service(tasks::delete_task),
    );
}
