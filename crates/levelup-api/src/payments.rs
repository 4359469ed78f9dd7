use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use rand::Rng;
use sha2::{Digest, Sha512};
use tracing::{info, warn};

use levelup_types::api::{
    CheckoutRequest, CheckoutResponse, Claims, GatewayCallback, GatewayFields, ReceiptResponse,
};
use levelup_types::models::PaymentStatus;

use crate::error::ApiError;
use crate::state::AppState;

/// Request signature the gateway verifies: lowercase hex SHA-512 over the
/// pipe-joined field sequence, with eleven empty slots reserved by the
/// gateway's protocol between email and salt.
pub fn gateway_hash(
    key: &str,
    txnid: &str,
    amount: &str,
    productinfo: &str,
    firstname: &str,
    email: &str,
    salt: &str,
) -> String {
    let sequence =
        format!("{key}|{txnid}|{amount}|{productinfo}|{firstname}|{email}|||||||||||{salt}");
    let mut hasher = Sha512::new();
    hasher.update(sequence.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_txnid() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(1000..=9999);
    format!("TXN{millis}{suffix}")
}

/// POST /payments/checkout — create a Pending payment and hand the frontend
/// everything it posts to the hosted gateway page.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let amount: f64 = req
        .amount
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid amount"))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::BadRequest("Invalid amount"));
    }

    let productinfo = req
        .plan
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "Subscription Plan".to_string());
    let txnid = new_txnid();

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let insert_email = claims.email.clone();
    let insert_name = claims.name.clone();
    let insert_plan = productinfo.clone();
    let insert_txnid = txnid.clone();
    let inserted = tokio::task::spawn_blocking(move || {
        db_state
            .db
            .insert_payment(&insert_email, &insert_name, &insert_plan, amount, &insert_txnid)
    })
    .await
    .map_err(ApiError::internal)??;
    if !inserted {
        return Err(ApiError::Conflict("Duplicate transaction id"));
    }

    let gateway = &state.config.gateway;
    let hash = gateway_hash(
        &gateway.merchant_key,
        &txnid,
        &req.amount,
        &productinfo,
        &claims.name,
        &claims.email,
        &gateway.merchant_salt,
    );

    let base = state.config.public_url.trim_end_matches('/');
    let fields = GatewayFields {
        key: gateway.merchant_key.clone(),
        txnid: txnid.clone(),
        amount: req.amount.clone(),
        productinfo: productinfo.clone(),
        firstname: claims.name.clone(),
        email: claims.email.clone(),
        // The gateway requires a phone field; we do not collect one.
        phone: "9999999999".to_string(),
        surl: format!(
            "{base}/payments/success?txnid={txnid}&productinfo={}&amount={}",
            urlencoding::encode(&productinfo),
            urlencoding::encode(&req.amount),
        ),
        furl: format!("{base}/payments/failure?txnid={txnid}"),
        hash,
    };

    info!("checkout {} for {} ({} {})", txnid, claims.email, productinfo, req.amount);

    Ok(Json(CheckoutResponse {
        gateway_url: gateway.gateway_url.clone(),
        fields,
    }))
}

/// POST /payments/success — the gateway's return leg posts form fields.
pub async fn success_post(
    State(state): State<AppState>,
    Form(params): Form<GatewayCallback>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    finish_payment(&state, params, PaymentStatus::Success).await
}

/// GET /payments/success — query fallback for gateways that redirect.
pub async fn success_get(
    State(state): State<AppState>,
    Query(params): Query<GatewayCallback>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    finish_payment(&state, params, PaymentStatus::Success).await
}

/// GET /payments/failure
pub async fn failure(
    State(state): State<AppState>,
    Query(params): Query<GatewayCallback>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    finish_payment(&state, params, PaymentStatus::Failed).await
}

async fn finish_payment(
    state: &AppState,
    params: GatewayCallback,
    status: PaymentStatus,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let txnid = params
        .txnid
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::BadRequest("Missing transaction id"))?;

    let db_state = state.clone();
    let update_txnid = txnid.clone();
    let payment = tokio::task::spawn_blocking(move || {
        if !db_state.db.set_payment_status(&update_txnid, status.as_str())? {
            warn!("gateway callback for unknown transaction {}", update_txnid);
            return Err(ApiError::NotFound("Payment not found"));
        }
        db_state
            .db
            .get_payment_by_txnid(&update_txnid)?
            .ok_or(ApiError::NotFound("Payment not found"))
    })
    .await
    .map_err(ApiError::internal)??;

    match status {
        PaymentStatus::Success => info!("payment success for {} - TXN: {}", payment.email, txnid),
        _ => warn!("payment failed for {} - TXN: {}", payment.email, txnid),
    }

    Ok(Json(ReceiptResponse {
        txnid,
        plan: params.productinfo.unwrap_or(payment.plan_name),
        amount: params.amount.unwrap_or_else(|| format!("{:.2}", payment.amount)),
        status: payment.status,
    }))
}

/// GET /payments/receipt/{txnid} — plain-text receipt as an attachment.
pub async fn receipt(
    State(state): State<AppState>,
    Path(txnid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let payment = tokio::task::spawn_blocking(move || db_state.db.get_payment_by_txnid(&txnid))
        .await
        .map_err(ApiError::internal)??
        .ok_or(ApiError::NotFound("Payment not found"))?;

    let body = format!(
        "Payment Receipt\n\n\
         Transaction ID: {}\n\
         Plan: {}\n\
         Amount Paid: ${:.2}\n\
         Status: {}\n\
         Date: {}\n\n\
         Thank you for your purchase!\n",
        payment.txnid, payment.plan_name, payment.amount, payment.status, payment.created_at,
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"receipt_{}.txt\"", payment.txnid),
            ),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_hash_matches_reference_vector() {
        let hash = gateway_hash(
            "merchant-key",
            "TXN17000000000001234",
            "499.00",
            "Premium Plan",
            "Alice",
            "a@example.com",
            "merchant-salt",
        );
        assert_eq!(
            hash,
            "8d65bc9990915bee8f69e09d96b8fd4259d54d1bcdfa202785598ac6ab64876a\
             14f621ec6f3f0aec65b62efc3fb7795825dace9407ece14b7a0f1a12ed1bad85"
        );
    }

    #[test]
    fn gateway_hash_is_sensitive_to_every_field() {
        let base = gateway_hash("k", "t", "1.00", "p", "f", "e", "s");
        assert_eq!(base.len(), 128);
        assert_ne!(base, gateway_hash("k", "t", "2.00", "p", "f", "e", "s"));
        assert_ne!(base, gateway_hash("k", "t", "1.00", "p", "f", "e", "other"));
    }

    #[test]
    fn txnids_carry_the_prefix_and_random_suffix() {
        let a = new_txnid();
        let b = new_txnid();
        assert!(a.starts_with("TXN"));
        assert!(a.len() > 7);
        // Same millisecond is possible; the random suffix still separates them.
        assert_ne!(a, b);
    }
}
