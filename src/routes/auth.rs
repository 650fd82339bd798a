use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, AuthSettings,
        AuthenticatedUserId, ChangePasswordRequest, LoginRequest, RegisterRequest,
    },
    error::AppError,
    models::{NewUser, User},
    store::Store,
};
use actix_web::{get, post, put, web, HttpResponse, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates the account and starts a session for it.
///
/// ## Responses:
/// - `201 Created`: `AuthResponse` with the session token.
/// - `400 Bad Request`: the email is already registered.
/// - `422 Unprocessable Entity`: username, email or password failed validation.
#[post("/register")]
pub async fn register(
    store: web::Data<dyn Store>,
    settings: web::Data<AuthSettings>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let data = register_data.into_inner();

    if store.find_user_by_email(&data.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(&data.password)?;
    let user = store
        .insert_user(NewUser {
            username: data.username,
            email: data.email,
            password_hash,
        })
        .await?;
    log::info!("registered user {}", user.id);

    let issued = generate_token(user.id, &settings)?;
    Ok(HttpResponse::Created().json(AuthResponse::new(issued, User::from(user))))
}

/// Login user
///
/// Checks the credentials and starts a new session.
///
/// ## Responses:
/// - `200 OK`: `AuthResponse` with the session token.
/// - `401 Unauthorized`: unknown email or wrong password.
/// - `422 Unprocessable Entity`: malformed email or empty password.
#[post("/login")]
pub async fn login(
    store: web::Data<dyn Store>,
    settings: web::Data<AuthSettings>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = match store.find_user_by_email(&login_data.email).await? {
        Some(user) => user,
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };
    if !verify_password(&login_data.password, &user.password_hash)? {
        log::info!("failed login for user {}", user.id);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let issued = generate_token(user.id, &settings)?;
    Ok(HttpResponse::Ok().json(AuthResponse::new(issued, User::from(user))))
}

/// The authenticated user's account.
#[get("/profile")]
pub async fn profile(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = store
        .find_user(user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(User::from(user)))
}

/// Change the authenticated user's password.
///
/// ## Responses:
/// - `204 No Content`: password replaced; existing sessions stay valid until they expire.
/// - `401 Unauthorized`: `current_password` is wrong.
/// - `422 Unprocessable Entity`: the new password is shorter than 6 characters.
#[put("/profile/password")]
pub async fn change_password(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
    password_data: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    password_data.validate()?;

    let user = store
        .find_user(user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if !verify_password(&password_data.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    let password_hash = hash_password(&password_data.new_password)?;
    store.update_password(user.id, &password_hash).await?;
    log::info!("user {} changed their password", user.id);

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> (web::Data<dyn Store>, web::Data<AuthSettings>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        (
            web::Data::from(store),
            web::Data::new(AuthSettings::new("route-test-secret", Duration::days(7))),
        )
    }

    #[actix_rt::test]
    async fn test_register_validation() {
        let (store, settings) = state();
        let app = test::init_service(
            App::new()
                .app_data(store)
                .app_data(settings)
                .service(register),
        )
        .await;

        for payload in [
            json!({"username": "test", "email": "invalid-email", "password": "password123"}),
            json!({"username": "test", "email": "test@example.com", "password": "short"}),
            json!({"username": "no spaces", "email": "test@example.com", "password": "password123"}),
        ] {
            let req = test::TestRequest::post()
                .uri("/register")
                .set_json(&payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", payload);
        }
    }

    #[actix_rt::test]
    async fn test_login_rejects_unknown_user() {
        let (store, settings) = state();
        let app = test::init_service(
            App::new()
                .app_data(store)
                .app_data(settings)
                .service(login),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "nobody@example.com", "password": "password123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
