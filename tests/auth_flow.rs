mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, EntityTrait, Set};
use tower::ServiceExt;

use inflatable_rentals_api::{
    entity::{Users, enums::Role, users},
    error::AppError,
    middleware::auth::{SESSION_COOKIE, issue_token},
    routes::create_router,
    services::{
        Caller, auth_service, seed_service,
        user_service::{self, NewUser},
    },
    state::AppState,
};

use common::{create_courier, create_customer, setup_state, unique};

async fn bearer(state: &AppState, user_id: i32) -> anyhow::Result<String> {
    let user = user_service::get_user(state, user_id).await?;
    let token = issue_token(&state.config.jwt_secret, &user)?;
    Ok(format!("Bearer {token}"))
}

async fn create_admin(state: &AppState) -> anyhow::Result<i32> {
    let login = unique("admin");
    let user = user_service::create_user(
        state,
        Caller::system(),
        NewUser {
            email: format!("{login}@e.cl"),
            login,
            password: "oficina123".into(),
            first_name: "Ana".into(),
            last_name: "Rojas".into(),
            phone: None,
            role: Role::Admin,
            is_superuser: false,
        },
    )
    .await?;
    Ok(user.id)
}

async fn send(
    state: &AppState,
    uri: &str,
    authorization: Option<&str>,
) -> anyhow::Result<axum::response::Response> {
    let mut request = Request::get(uri);
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }
    let response = create_router()
        .with_state(state.clone())
        .oneshot(request.body(Body::empty())?)
        .await?;
    Ok(response)
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn legacy_user(
    state: &inflatable_rentals_api::state::AppState,
    secret: &str,
) -> anyhow::Result<users::Model> {
    let login = unique("legacy");
    let user = users::ActiveModel {
        id: NotSet,
        email: Set(format!("{login}@e.cl")),
        login: Set(login),
        password_hash: Set(secret.to_string()),
        first_name: Set("Ana".into()),
        last_name: Set("Rojas".into()),
        phone: Set(None),
        role: Set(Role::Admin),
        is_active: Set(true),
        is_superuser: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(user)
}

#[tokio::test]
async fn legacy_plaintext_login_is_promoted() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = legacy_user(&state, "clave-antigua").await?;

    let logged_in = auth_service::authenticate(&state, &user.email, "clave-antigua").await?;
    assert_eq!(logged_in.id, user.id);

    let stored = Users::find_by_id(user.id)
        .one(&state.orm)
        .await?
        .expect("user still there");
    assert_ne!(stored.password_hash, "clave-antigua");
    assert!(auth_service::is_known_hash(&stored.password_hash));

    // Second login now goes through the KDF.
    auth_service::authenticate(&state, &user.login, "clave-antigua").await?;
    let wrong = auth_service::authenticate(&state, &user.login, "otra-clave")
        .await
        .unwrap_err();
    assert!(matches!(wrong, AppError::Unauthorized));

    Ok(())
}

#[tokio::test]
async fn form_login_sets_cookie_and_routes_to_panel() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    // The shared reset password keeps this login valid while other tests reset couriers.
    let password = seed_service::COURIER_RESET_PASSWORD;
    let courier = create_courier(&state, password).await?;
    let app = create_router().with_state(state.clone());

    let body = format!(
        "email={}&password={password}",
        courier.user.email.replace('@', "%40")
    );
    let response = app
        .clone()
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/panel");

    let set_cookie = response.headers()[header::SET_COOKIE].to_str()?.to_string();
    assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap_or_default().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::get("/panel")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.headers()[header::LOCATION], "/courier-panel");

    let response = app
        .clone()
        .oneshot(
            Request::get("/courier-panel")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::get("/admin-panel")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    Ok(())
}

#[tokio::test]
async fn bad_credentials_render_the_login_page() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let app = create_router().with_state(state);
    let response = app
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=nadie%40e.cl&password=incorrecta"))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["data"]["error"], "Invalid credentials");

    Ok(())
}

#[tokio::test]
async fn panel_dispatches_by_role() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = bearer(&state, create_admin(&state).await?).await?;
    let courier = create_courier(&state, "repartidor-2").await?;
    let courier = bearer(&state, courier.user.id).await?;
    let customer = create_customer(&state).await?;
    let customer = bearer(&state, customer.user.id).await?;

    assert_eq!(location(&send(&state, "/panel", Some(&admin)).await?), "/admin-panel");
    assert_eq!(location(&send(&state, "/panel", Some(&courier)).await?), "/courier-panel");
    assert_eq!(location(&send(&state, "/panel", Some(&customer)).await?), "/login");

    assert_eq!(location(&send(&state, "/admin-panel", Some(&courier)).await?), "/login");
    assert_eq!(location(&send(&state, "/courier-panel", Some(&admin)).await?), "/login");
    assert_eq!(
        send(&state, "/admin-panel", Some(&admin)).await?.status(),
        StatusCode::OK
    );

    assert_eq!(
        send(&state, "/api/admin/reservations", Some(&customer)).await?.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        send(&state, "/api/admin/dashboard", Some(&courier)).await?.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        send(&state, "/api/courier/jobs", Some(&admin)).await?.status(),
        StatusCode::FORBIDDEN
    );

    Ok(())
}

#[tokio::test]
async fn signed_in_customer_is_not_bounced_between_login_and_panel() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_customer(&state).await?;
    let token = bearer(&state, customer.user.id).await?;

    let login = send(&state, "/login", Some(&token)).await?;
    assert_eq!(login.status(), StatusCode::OK);
    assert!(login.headers().get(header::LOCATION).is_none());

    let panel = send(&state, "/panel", Some(&token)).await?;
    assert_eq!(location(&panel), "/login");

    let staff = bearer(&state, create_admin(&state).await?).await?;
    let login = send(&state, "/login", Some(&staff)).await?;
    assert_eq!(login.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&login), "/panel");

    Ok(())
}

#[tokio::test]
async fn deactivation_revokes_existing_tokens() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin_id = create_admin(&state).await?;
    let token = bearer(&state, admin_id).await?;
    assert_eq!(
        send(&state, "/api/admin/dashboard", Some(&token)).await?.status(),
        StatusCode::OK
    );

    user_service::deactivate(&state, Caller::system(), admin_id).await?;

    assert_eq!(
        send(&state, "/api/admin/dashboard", Some(&token)).await?.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(location(&send(&state, "/panel", Some(&token)).await?), "/login");
    assert_eq!(location(&send(&state, "/admin-panel", Some(&token)).await?), "/login");

    Ok(())
}

#[tokio::test]
async fn courier_passwords_reset_together() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let first = create_courier(&state, "clave-propia-1").await?;
    let second = create_courier(&state, "clave-propia-2").await?;

    let updated = seed_service::reset_courier_passwords(&state).await?;
    assert!(updated >= 2);

    for courier in [&first, &second] {
        let user = auth_service::authenticate(
            &state,
            &courier.user.login,
            seed_service::COURIER_RESET_PASSWORD,
        )
        .await?;
        assert_eq!(user.id, courier.user.id);
    }
    let old = auth_service::authenticate(&state, &first.user.login, "clave-propia-1")
        .await
        .unwrap_err();
    assert!(matches!(old, AppError::Unauthorized));

    let short = user_service::reset_courier_passwords(&state, "abc").await.unwrap_err();
    assert!(matches!(short, AppError::Validation { .. }));

    Ok(())
}
