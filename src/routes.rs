// src/routes.rs

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, analysis, auth, exams, generation, questions, resources, teachers},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, questions, ai, exams, teachers, resources, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, AI services).
pub fn create_router(state: AppState) -> Router {
    // The API is consumed by a separately hosted front end, so any origin
    // is allowed.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let question_routes = Router::new().route("/", get(questions::list_questions));

    let ai_routes = Router::new()
        .route("/questions", post(generation::generate_questions))
        .route("/analysis", post(analysis::analyze_exam))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let exam_routes = Router::new()
        .route("/leaderboard", get(exams::get_leaderboard))
        // Protected exam routes
        .merge(
            Router::new()
                .route("/", post(exams::submit_exam))
                .route("/mine", get(exams::my_exams))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let teacher_routes = Router::new()
        .route("/", get(teachers::list_teachers))
        .merge(
            Router::new()
                .route("/apply", post(teachers::apply))
                .route("/live", put(teachers::set_live_status))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let resource_routes = Router::new()
        .route(
            "/",
            get(resources::list_resources).post(resources::create_resource),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/teacher-requests", get(admin::list_teacher_requests))
        .route("/teacher-requests/{id}", put(admin::review_teacher_request))
        .route("/resources/{id}", delete(admin::delete_resource))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/ai", ai_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/teachers", teacher_routes)
        .nest("/api/resources", resource_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
