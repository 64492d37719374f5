use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, patch, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{DefaultPolicyEvaluator, PolicyEvaluator};
use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::routes::{
    activity, alerts, api_keys, health, inventory, restocks, roles, schedules, scopes, shifts, users,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub authz: Arc<dyn PolicyEvaluator>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, authz: Arc<dyn PolicyEvaluator>, event_bus: EventBus) -> Self {
        Self { pool, authz, event_bus }
    }
}

/// Build the router with the default policy and a running activity listener.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let (event_bus, rx) = events::init_event_bus();
    tokio::spawn(events::start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, Arc::new(DefaultPolicyEvaluator::new()), event_bus);
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let schedule_routes = Router::new()
        .route("/", get(schedules::list_schedules).post(schedules::create_schedule))
        .route("/current", get(schedules::current_schedule))
        .route("/public", get(schedules::public_schedule))
        .route("/current/alerts", get(alerts::active_alerts))
        .route("/current/shifts/by/user/:user_uuid", get(shifts::current_shifts_for_user))
        .route("/current/drops/by/user/:user_uuid", get(shifts::current_drops_for_user))
        .route("/current/pickups/by/user/:user_uuid", get(shifts::current_pickups_for_user))
        .route("/current/:schedule_uuid", patch(schedules::activate_schedule))
        .route(
            "/:schedule_uuid",
            get(schedules::get_schedule)
                .put(schedules::replace_schedule)
                .patch(schedules::patch_schedule)
                .delete(schedules::delete_schedule),
        )
        .route("/:schedule_uuid/shifts", post(shifts::create_shift))
        .route(
            "/:schedule_uuid/shifts/:shift_uuid",
            put(shifts::update_shift).delete(shifts::delete_shift),
        )
        .route("/:schedule_uuid/shifts/:shift_uuid/event", patch(shifts::add_shift_event))
        .route("/:schedule_uuid/alerts", post(alerts::create_alert))
        .route(
            "/:schedule_uuid/alerts/:alert_uuid",
            put(alerts::update_alert).delete(alerts::delete_alert),
        );

    let role_routes = Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/:role_uuid",
            get(roles::get_role).put(roles::update_role).delete(roles::delete_role),
        );

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/self", get(users::get_self))
        .route("/self/scopes", get(users::get_self_scopes))
        .route("/initialize_admin", post(users::initialize_admin))
        .route("/by/email/:email", get(users::get_user_by_email))
        .route("/by/id/:college_id", get(users::get_user_by_college_id))
        .nest("/roles", role_routes)
        .route(
            "/:user_uuid",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/:user_uuid/roles/:role_uuid",
            post(users::grant_role).delete(users::revoke_role),
        );

    let restock_routes = Router::new()
        .route("/", get(restocks::list_requests).post(restocks::create_request))
        .route("/by/user/:user_uuid", get(restocks::list_requests_by_user))
        .route(
            "/:request_uuid",
            get(restocks::get_request)
                .put(restocks::update_request)
                .delete(restocks::delete_request),
        )
        .route("/:request_uuid/status", patch(restocks::update_request_status));

    let inventory_routes = Router::new()
        .route("/", get(inventory::list_items).post(inventory::create_item))
        .route("/public", get(inventory::public_items))
        .route(
            "/:item_uuid",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        );

    let api_key_routes = Router::new()
        .route("/", get(api_keys::list_api_keys).post(api_keys::create_api_key))
        .route("/:key_uuid", axum::routing::delete(api_keys::revoke_api_key));

    Router::new()
        .nest("/schedules", schedule_routes)
        .nest("/users", user_routes)
        .nest("/inventory", inventory_routes)
        .nest("/restocks", restock_routes)
        .nest("/api-keys", api_key_routes)
        .route("/scopes", get(scopes::list_scopes))
        .route("/activity", get(activity::list_activity))
        .route("/api/health", get(health::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
