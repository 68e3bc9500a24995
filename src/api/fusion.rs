//! Fusion API handlers
//!
//! Quote requests and order submission.

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::generic::{relay_rejection, require_non_empty, success_reply};
use crate::fusion::{FusionClient, Quote};
use crate::serde_helpers::string_from_any;

// ============================================================================
// REQUEST STRUCTURES
// ============================================================================

/// Request body of `POST /fusion/quote`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Token sold by the maker
    pub from_token: String,
    /// Token bought by the maker
    pub to_token: String,
    /// Amount of `from_token` in base units (decimal string or number)
    #[serde(deserialize_with = "string_from_any")]
    pub amount: String,
}

/// Request body of `POST /fusion/order`.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    /// Quote as returned by `/fusion/quote`
    pub quote: Quote,
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Handler for POST /fusion/quote.
///
/// # Returns
///
/// * `Ok(warp::Reply)` - Upstream quote in the `data` field
/// * `Err(warp::Rejection)` - Invalid request (400) or upstream failure (502)
pub async fn quote_handler(
    request: QuoteRequest,
    client: Arc<FusionClient>,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_non_empty("fromToken", &request.from_token)?;
    require_non_empty("toToken", &request.to_token)?;
    require_non_empty("amount", &request.amount)?;

    let quote = client
        .get_quote(&request.from_token, &request.to_token, &request.amount)
        .await
        .map_err(relay_rejection)?;

    Ok(success_reply(quote))
}

/// Handler for POST /fusion/order.
///
/// Each call submits a new order, also for a quote that was submitted before.
///
/// # Returns
///
/// * `Ok(warp::Reply)` - Order hash, signature and submitted order
/// * `Err(warp::Rejection)` - Unusable quote (400) or upstream failure (502)
pub async fn order_handler(
    request: OrderRequest,
    client: Arc<FusionClient>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let submission = client
        .submit_order(&request.quote)
        .await
        .map_err(relay_rejection)?;

    info!("Order {} accepted by relayer", submission.order_hash);
    Ok(success_reply(submission))
}
