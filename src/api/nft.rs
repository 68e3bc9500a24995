//! NFT aggregation handler

use serde::Deserialize;
use std::sync::Arc;

use super::generic::{require_non_empty, success_reply};
use crate::nft::NftClient;

/// Request body of `POST /nfts`.
#[derive(Debug, Deserialize)]
pub struct NftRequest {
    /// Wallet addresses to look up
    pub owners: Vec<String>,
}

/// Handler for POST /nfts.
///
/// Responds once every lookup finished, with one record per owner in request
/// order. Individual lookup failures are reported inside the records; the
/// request itself still succeeds.
pub async fn nfts_handler(
    request: NftRequest,
    client: Arc<NftClient>,
) -> Result<impl warp::Reply, warp::Rejection> {
    for owner in &request.owners {
        require_non_empty("owners", owner)?;
    }

    let results = client.aggregate(&request.owners).await;
    Ok(success_reply(results))
}
