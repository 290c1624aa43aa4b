pub mod accounts;
pub mod health;
pub mod tax;

use crate::db::Repository;
use crate::orchestration::TaxService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub service: TaxService,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, service: TaxService) -> Self {
        Self { repo, service }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/v1/accounts/:id/executions",
            post(accounts::add_manual_execution),
        )
        .route("/v1/accounts/:id/tax", get(tax::get_tax_report))
        .route("/v1/accounts/:id/tax/export", get(tax::export_tax_csv))
        .layer(cors)
        .with_state(state)
}
