//! HTTP surface. Authentication happens upstream: the gateway forwards the
//! caller's id in `x-user-id` and marks back-office callers with
//! `x-user-role: admin`.

use std::sync::Arc;

use axum::{extract::{Path, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use uuid::Uuid;

use crate::checkout::{CartCheckout, CheckoutService};
use crate::domain::aggregates::{CartBreakdown, CartEntry, PrintRequest, PrintStatus};
use crate::domain::value_objects::{Address, Identity};
use crate::ports::CheckoutSession;
use crate::reconciler::{PrintRequestPatch, PrintRequestReconciler, QuoteRequest};
use crate::PrintShopError;

pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Clone)] pub struct AppState { pub reconciler: Arc<PrintRequestReconciler>, pub checkout: Arc<CheckoutService> }

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-printshop"})) }))
        .route("/api/v1/print-requests", post(create_request))
        .route("/api/v1/print-requests/:id", get(get_request).patch(update_request).delete(delete_request))
        .route("/api/v1/print-requests/:id/checkout", post(checkout_request))
        .route("/api/v1/admin/print-requests/:id/quote", post(quote_request))
        .route("/api/v1/admin/print-requests/:id/cancel", post(cancel_request))
        .route("/api/v1/admin/print-requests/:id/status", post(set_status))
        .route("/api/v1/cart/breakdown", post(cart_breakdown))
        .route("/api/v1/checkout", post(checkout_cart))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: PrintShopError) -> (StatusCode, String) {
    match e {
        PrintShopError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
        PrintShopError::InvalidIdentifier(_) | PrintShopError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        PrintShopError::Storage(_) => {
            error!(error = %e, "storage failure");
            (StatusCode::SERVICE_UNAVAILABLE, "temporarily unavailable, please retry".to_string())
        }
        PrintShopError::Payment(_) => (StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

fn user_id(headers: &HeaderMap) -> ApiResult<String> {
    headers.get(USER_HEADER).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
        .ok_or((StatusCode::UNAUTHORIZED, format!("missing {USER_HEADER}")))
}

fn require_admin(headers: &HeaderMap) -> ApiResult<()> {
    match headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(role) if role.eq_ignore_ascii_case("admin") => Ok(()),
        _ => Err((StatusCode::FORBIDDEN, "admin only".to_string())),
    }
}

fn admin_target(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| reject(PrintShopError::NotFound))
}

#[derive(Debug, Default, Deserialize)] pub struct CreateRequestBody { pub email: Option<String>, pub display_name: Option<String> }

async fn create_request(State(s): State<AppState>, headers: HeaderMap, Json(r): Json<CreateRequestBody>) -> ApiResult<(StatusCode, Json<PrintRequest>)> {
    let user = user_id(&headers)?;
    let identity = r.email.map(|email| Identity { email, display_name: r.display_name.unwrap_or_else(|| Identity::UNKNOWN_NAME.to_string()) });
    let created = s.reconciler.create(&user, identity).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_request(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<PrintRequest>> {
    let user = user_id(&headers)?;
    s.reconciler.get_or_lazy_create(&id, &user).await.map(Json).map_err(reject)
}

async fn update_request(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(patch): Json<PrintRequestPatch>) -> ApiResult<Json<PrintRequest>> {
    let user = user_id(&headers)?;
    s.reconciler.apply_update(&id, &user, patch).await.map(Json).map_err(reject)
}

async fn delete_request(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let user = user_id(&headers)?;
    let id = Uuid::parse_str(&id).map_err(|_| reject(PrintShopError::NotFound))?;
    s.reconciler.delete(id, &user).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn checkout_request(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<CheckoutSession>> {
    let user = user_id(&headers)?;
    s.checkout.checkout_print_request(&id, &user).await.map(Json).map_err(reject)
}

async fn quote_request(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(q): Json<QuoteRequest>) -> ApiResult<Json<PrintRequest>> {
    require_admin(&headers)?;
    s.reconciler.quote(admin_target(&id)?, q).await.map(Json).map_err(reject)
}

#[derive(Debug, Default, Deserialize)] pub struct CancelBody { pub note: Option<String> }

async fn cancel_request(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(b): Json<CancelBody>) -> ApiResult<Json<PrintRequest>> {
    require_admin(&headers)?;
    s.reconciler.cancel(admin_target(&id)?, b.note).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct StatusBody { pub status: PrintStatus, pub note: Option<String> }

async fn set_status(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(b): Json<StatusBody>) -> ApiResult<Json<PrintRequest>> {
    require_admin(&headers)?;
    s.reconciler.admin_set_status(admin_target(&id)?, b.status, b.note).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct CartRequest { pub items: Vec<CartEntry>, #[serde(default)] pub address: Address, pub customer_email: Option<String> }

async fn cart_breakdown(State(s): State<AppState>, Json(r): Json<CartRequest>) -> ApiResult<Json<CartBreakdown>> {
    s.checkout.breakdown(&r.items, &r.address).await.map(Json).map_err(reject)
}

async fn checkout_cart(State(s): State<AppState>, Json(r): Json<CartRequest>) -> ApiResult<Json<CartCheckout>> {
    s.checkout.checkout_cart(&r.items, &r.address, r.customer_email).await.map(Json).map_err(reject)
}
