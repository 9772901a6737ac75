use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::gate::{AuthorizationGate, RequestCredentials};
use crate::error::AppError;

/// Routes reachable without credentials.
const PUBLIC_PATHS: [&str; 5] = [
    "/health",
    "/api/auth/signup",
    "/api/auth/login",
    "/api/auth/session",
    "/api/auth/logout",
];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS
        .iter()
        .any(|public| path == *public || path.strip_prefix(public) == Some("/"))
}

/// Runs every non-public request through the [`AuthorizationGate`] and stores the
/// resulting [`crate::models::Principal`] in the request extensions.
#[derive(Clone)]
pub struct AuthMiddleware {
    gate: Arc<AuthorizationGate>,
}

impl AuthMiddleware {
    pub fn new(gate: Arc<AuthorizationGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            gate: Arc::clone(&self.gate),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<AuthorizationGate>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let service = Rc::clone(&self.service);
        let gate = Arc::clone(&self.gate);
        Box::pin(async move {
            let credentials = RequestCredentials::from_request(req.request());
            match gate.authorize(&credentials).await {
                Ok(principal) => {
                    req.extensions_mut().insert(principal);
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                }
                Err(rejection) => {
                    log::debug!("{} {} rejected: {}", req.method(), req.path(), rejection);
                    let response = AppError::from(rejection).error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedPrincipal, SessionAuthenticator, TokenAuthenticator};
    use crate::models::Principal;
    use crate::store::memory::InMemorySessionStore;
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, web, App, HttpResponse};
    use chrono::Duration;
    use uuid::Uuid;

    #[actix_rt::test]
    async fn test_gate_guards_private_routes() {
        let tokens = Arc::new(TokenAuthenticator::new("mw-secret", Duration::hours(1)));
        let sessions = Arc::new(SessionAuthenticator::new(
            Arc::new(InMemorySessionStore::new()),
            Duration::hours(1),
        ));
        let gate = Arc::new(AuthorizationGate::new(tokens.clone(), sessions));
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(gate))
                .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .route(
                    "/api/tasks",
                    web::get().to(|principal: AuthenticatedPrincipal| async move {
                        HttpResponse::Ok().body(principal.0.username)
                    }),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = actix_test::TestRequest::get().uri("/api/tasks").to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let token = tokens
            .issue(&Principal {
                id: Uuid::new_v4(),
                username: "carol".into(),
            })
            .unwrap()
            .token;
        let req = actix_test::TestRequest::get()
            .uri("/api/tasks")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, web::Bytes::from_static(b"carol"));
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/auth/logout/"));
        assert!(!is_public("/api/auth/me"));
        assert!(!is_public("/api/tasks"));
        assert!(!is_public("/api/auth/login-as-admin"));
    }
}
