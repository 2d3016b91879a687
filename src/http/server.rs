//! Main router configuration assembling the token, developer application and UI endpoints.

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{
    context::AppState,
    handler_developer_application::{
        create_application_handler, current_application_handler, delete_application_handler,
        get_application_handler, login_application_handler, reset_token_handler,
        update_callback_uris_handler,
    },
    handler_index::{
        handle_burn_token, handle_index, handle_login, handle_me, handle_user_applications,
    },
    handler_password::{create_test_user_handler, login_test_user_handler},
    handler_ui::{
        handle_discord_callback, handle_github_callback, handle_google_callback,
        handle_login as handle_ui_login, handle_ui,
    },
    utils_http::EXCHANGE_TOKEN_HEADER,
};

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    let developer_application_routes = Router::new()
        .route("/", post(create_application_handler))
        .route("/login", post(login_application_handler))
        .route("/me", get(current_application_handler))
        .route(
            "/{application_id}",
            get(get_application_handler).delete(delete_application_handler),
        )
        .route("/{application_id}/reset_token", patch(reset_token_handler))
        .route(
            "/{application_id}/callback_uris",
            patch(update_callback_uris_handler),
        );

    let ui_routes = Router::new()
        .route("/", get(handle_ui))
        .route("/login", get(handle_ui_login))
        .route("/discord-callback", get(handle_discord_callback))
        .route("/github-callback", get(handle_github_callback))
        .route("/google-callback", get(handle_google_callback));

    let mut router = Router::new()
        .route("/", get(handle_index))
        .route("/me", get(handle_me))
        .route("/login", post(handle_login))
        .route("/burn-token", post(handle_burn_token))
        .route("/user/applications", get(handle_user_applications))
        .nest("/developer_application", developer_application_routes)
        .nest("/ui", ui_routes);

    // Password test users only exist on debug deployments
    if *ctx.config.debug_routes.as_ref() {
        tracing::warn!("debug routes enabled, password test users can be created");
        router = router
            .route("/create_test_user", post(create_test_user_handler))
            .route("/login_test_user", post(login_test_user_handler));
    }

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(EXCHANGE_TOKEN_HEADER),
        ]);
    match ctx.config.site_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!(error = ?e, "site url is not a valid CORS origin"),
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
