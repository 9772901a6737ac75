#![allow(dead_code)]

use actix_cors::Cors;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;

use neotask::auth::{AuthMiddleware, TokenResponse};
use neotask::config::Config;
use neotask::routes::{self, health};
use neotask::state::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";

/// In-memory state with a cheap bcrypt cost.
pub fn test_state() -> web::Data<AppState> {
    let mut config = Config::with_secret(TEST_SECRET);
    config.bcrypt_cost = 4;
    web::Data::new(AppState::in_memory(&config).expect("in-memory state"))
}

pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    let gate = Arc::clone(&state.gate);
    test::init_service(
        App::new()
            .app_data(state)
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
                    .wrap(AuthMiddleware::new(gate))
                    .configure(routes::config),
            ),
    )
    .await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Signs a user up and returns a bearer token for them.
pub async fn signup_and_login(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    username: &str,
    password: &str,
) -> String {
    let credentials = json!({ "username": username, "password": password });

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(&credentials)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(
        resp.status(),
        actix_web::http::StatusCode::CREATED,
        "signup of {} failed",
        username
    );

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&credentials)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let login: TokenResponse = test::read_body_json(resp).await;
    login.token
}
