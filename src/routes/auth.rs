use crate::{
    auth::{
        AuthenticatedPrincipal, LoginRequest, PrincipalResponse, SignupRequest, TokenResponse,
        SESSION_COOKIE,
    },
    error::AppError,
    state::AppState,
};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use validator::Validate;

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Register a new account.
///
/// ## Responses:
/// - `201 Created`: `{id, username}` of the new account.
/// - `409 Conflict`: The username is already taken.
/// - `422 Unprocessable Entity`: Username or password fails validation.
#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    signup_data: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    signup_data.validate()?;

    let principal = state
        .credentials
        .create(&signup_data.username, &signup_data.password)
        .await?;

    Ok(HttpResponse::Created().json(PrincipalResponse::from(principal)))
}

/// Login for API clients.
///
/// Verifies the credentials and returns a signed bearer token.
///
/// ## Responses:
/// - `200 OK`: A `TokenResponse`.
/// - `401 Unauthorized`: Unknown username or wrong password, indistinguishably.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let principal = state
        .credentials
        .verify(&login_data.username, &login_data.password)
        .await?;
    let issued = state.tokens.issue(&principal)?;
    log::info!("issued bearer token for {}", principal.username);

    Ok(HttpResponse::Ok().json(TokenResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        user_id: principal.id,
        username: principal.username,
    }))
}

/// Login for browsers.
///
/// Verifies the credentials, opens a server-side session and sets the session cookie.
///
/// ## Responses:
/// - `200 OK`: `{id, username}` with a `Set-Cookie` header.
/// - `401 Unauthorized`: Unknown username or wrong password, indistinguishably.
#[post("/session")]
pub async fn session_login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let principal = state
        .credentials
        .verify(&login_data.username, &login_data.password)
        .await?;
    let session = state.sessions.login(principal).await?;
    log::info!("opened session for {}", session.principal.username);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(session.id))
        .json(PrincipalResponse::from(session.principal)))
}

/// Destroy the current session, if any, and clear the cookie. Always `204 No Content`.
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        state.sessions.logout(cookie.value()).await?;
    }

    let mut removal = session_cookie(String::new());
    removal.make_removal();
    Ok(HttpResponse::NoContent().cookie(removal).finish())
}

/// The principal the current request is authenticated as.
#[get("/me")]
pub async fn me(principal: AuthenticatedPrincipal) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(PrincipalResponse::from(principal.0)))
}
