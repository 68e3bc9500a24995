//! Generic API structures and handlers
//!
//! This module contains the response envelope, custom rejections, the
//! rejection handler and the route table of the relay. Area-specific request
//! types and handlers live in the sibling modules.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::hyper::body::Bytes;
use warp::{
    http::{Method, StatusCode},
    Filter, Rejection, Reply,
};

use crate::config::Config;
use crate::error::RelayError;
use crate::fusion::FusionClient;
use crate::nft::NftClient;
use crate::push::PushClient;
use crate::storage::SubscriptionStore;

/// Request bodies above this size are rejected before parsing.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response structure for all API endpoints.
///
/// Upstream payloads are carried verbatim in `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    pub data: Option<T>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Wraps `data` in a successful envelope.
pub fn success_reply<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
}

/// Deserializes a raw request body, logging it at debug level.
///
/// # Returns
///
/// * `Ok(T)` - Parsed request
/// * `Err(warp::Rejection)` - `JsonDeserializeError` for malformed JSON or missing fields
pub fn parse_body<T: DeserializeOwned>(route: &str, body: &Bytes) -> Result<T, Rejection> {
    let body_str = String::from_utf8_lossy(body);
    debug!("POST {} - Received body: {}", route, body_str);

    serde_json::from_slice::<T>(body).map_err(|e| {
        error!("{} deserialization failed: {}. Body: {}", route, e, body_str);
        warp::reject::custom(JsonDeserializeError(format!("Invalid JSON: {}", e)))
    })
}

/// Rejects with a 400 unless `value` has non-whitespace content.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), Rejection> {
    if value.trim().is_empty() {
        return Err(warp::reject::custom(JsonDeserializeError(format!(
            "Field '{}' must not be empty",
            field
        ))));
    }
    Ok(())
}

/// Maps a library error onto the matching rejection.
pub fn relay_rejection(err: RelayError) -> Rejection {
    match err {
        RelayError::InvalidInput(message) => warp::reject::custom(JsonDeserializeError(message)),
        err if err.is_upstream() => {
            error!("Upstream failure: {}", err);
            warp::reject::custom(UpstreamError(err.to_string()))
        }
        err => {
            error!("Request failed: {}", err);
            warp::reject::custom(InternalError(err.to_string()))
        }
    }
}

// ============================================================================
// CUSTOM REJECTION TYPES
// ============================================================================

/// Custom rejection for JSON deserialization errors and invalid input
#[derive(Debug)]
pub struct JsonDeserializeError(pub String);

impl warp::reject::Reject for JsonDeserializeError {}

/// Upstream service failed or could not be reached
#[derive(Debug)]
pub struct UpstreamError(pub String);

impl warp::reject::Reject for UpstreamError {}

/// Local failure (signing, storage)
#[derive(Debug)]
pub struct InternalError(pub String);

impl warp::reject::Reject for InternalError {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.iter().any(|origin| origin == "*") {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// This function handles all warp rejections and converts them into
/// standardized API responses with appropriate HTTP status codes.
///
/// # Arguments
///
/// * `rej` - The warp rejection to handle
///
/// # Returns
///
/// A warp reply with an error response
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<JsonDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.0.clone())
    } else if let Some(err) = rej.find::<UpstreamError>() {
        (StatusCode::BAD_GATEWAY, err.0.clone())
    } else if let Some(err) = rej.find::<InternalError>() {
        (StatusCode::INTERNAL_SERVER_ERROR, err.0.clone())
    } else if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", err))
    } else if rej.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if rej.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
        status,
    ))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server of the relay.
///
/// Exposes the Fusion, NFT and Push endpoints. All upstream clients are built
/// once at startup and shared between requests.
pub struct ApiServer {
    /// Service configuration
    config: Arc<Config>,
    fusion: Arc<FusionClient>,
    nft: Arc<NftClient>,
    push: Arc<PushClient>,
    /// Webhook registrations shared with the notification relay
    store: Arc<SubscriptionStore>,
}

impl ApiServer {
    /// Creates a new API server with the given components.
    pub fn new(
        config: Arc<Config>,
        fusion: Arc<FusionClient>,
        nft: Arc<NftClient>,
        push: Arc<PushClient>,
        store: Arc<SubscriptionStore>,
    ) -> Self {
        Self {
            config,
            fusion,
            nft,
            push,
            store,
        }
    }

    /// Starts the API server and begins handling HTTP requests.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server stopped
    /// * `Err(anyhow::Error)` - Configured address is invalid
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.config.api.host, self.config.api.port
        );

        let routes = self.create_routes();

        let addr: std::net::SocketAddr = format!("{}:{}", self.config.api.host, self.config.api.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    ///
    /// # Returns
    ///
    /// A warp filter containing all API routes
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        use super::{fusion, nft, push};

        // Health check endpoint - returns service status
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| success_reply("Relay service is running"));

        // POST /fusion/quote - Request a Fusion quote
        let quote_fusion = self.fusion.clone();
        let fusion_quote = warp::path("fusion")
            .and(warp::path("quote"))
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = quote_fusion.clone();
                async move {
                    let request = parse_body::<fusion::QuoteRequest>("/fusion/quote", &body)?;
                    fusion::quote_handler(request, client).await
                }
            });

        // POST /fusion/order - Build, sign and submit an order for a quote
        let order_fusion = self.fusion.clone();
        let fusion_order = warp::path("fusion")
            .and(warp::path("order"))
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = order_fusion.clone();
                async move {
                    let request = parse_body::<fusion::OrderRequest>("/fusion/order", &body)?;
                    fusion::order_handler(request, client).await
                }
            });

        // POST /nfts - Aggregate NFT inventories of several owners
        let nft_client = self.nft.clone();
        let nfts = warp::path("nfts")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = nft_client.clone();
                async move {
                    let request = parse_body::<nft::NftRequest>("/nfts", &body)?;
                    nft::nfts_handler(request, client).await
                }
            });

        // POST /createPushSpace - Create a token-gated space
        let space_push = self.push.clone();
        let create_space = warp::path("createPushSpace")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = space_push.clone();
                async move {
                    let request = parse_body::<push::CreateSpaceRequest>("/createPushSpace", &body)?;
                    push::create_space_handler(request, client).await
                }
            });

        // POST /getAccess - Check space access for a DID
        let access_push = self.push.clone();
        let get_access = warp::path("getAccess")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = access_push.clone();
                async move {
                    let request = parse_body::<push::GetAccessRequest>("/getAccess", &body)?;
                    push::get_access_handler(request, client).await
                }
            });

        // POST /createPushChannel - Create a channel owned by the maker
        let channel_push = self.push.clone();
        let create_channel = warp::path("createPushChannel")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = channel_push.clone();
                async move {
                    let request =
                        parse_body::<push::CreateChannelRequest>("/createPushChannel", &body)?;
                    push::create_channel_handler(request, client).await
                }
            });

        // POST /subscribeChannel - Opt in to a channel and register a webhook
        let subscribe_push = self.push.clone();
        let subscribe_store = self.store.clone();
        let subscribe = warp::path("subscribeChannel")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body())
            .and_then(move |body: Bytes| {
                let client = subscribe_push.clone();
                let store = subscribe_store.clone();
                async move {
                    let request = parse_body::<push::SubscribeRequest>("/subscribeChannel", &body)?;
                    push::subscribe_handler(request, client, store).await
                }
            });

        // GET /subscriptions - Registered webhooks
        let list_store = self.store.clone();
        let subscriptions = warp::path("subscriptions")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let store = list_store.clone();
                async move { push::list_subscriptions_handler(store).await }
            });

        // Combine all routes and apply rejection handler
        health
            .or(fusion_quote)
            .or(fusion_order)
            .or(nfts)
            .or(create_space)
            .or(get_access)
            .or(create_channel)
            .or(subscribe)
            .or(subscriptions)
            .with(create_cors_filter(&self.config.api.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    #[allow(dead_code)] // Used by tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}

/// Raw request body, size-limited.
fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}
