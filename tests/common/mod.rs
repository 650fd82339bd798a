#![allow(dead_code)]

use actix_cors::Cors;
use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    middleware::Logger,
    test, web, App, Error,
};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;

use planit::{
    auth::{AuthMiddleware, AuthSettings},
    routes::{self, health},
    store::{MemoryStore, Store},
};

pub const SECRET: &str = "integration-test-secret";

pub fn auth_settings() -> AuthSettings {
    AuthSettings::new(SECRET, Duration::days(7))
}

/// The full application, wired like `main.rs`, over an in-memory store.
pub async fn spawn_app(
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let settings = auth_settings();
    test::init_service(
        App::new()
            .app_data(web::Data::from(store))
            .app_data(web::Data::new(settings.clone()))
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
                    .wrap(AuthMiddleware::new(settings))
                    .configure(routes::config),
            ),
    )
    .await
}

/// Registers `username` and returns the session token.
pub async fn register<S, B>(app: &S, username: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "Password123!"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    body["token"]
        .as_str()
        .expect("register response carries a token")
        .to_string()
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
