//! REST API Server Module
//!
//! This module provides the REST API of the relay: Fusion quotes and orders,
//! NFT aggregation, and the Push space, channel and subscription endpoints.

// Envelope, rejections and route table
mod generic;

mod fusion;
mod nft;
mod push;

// Re-export ApiServer for convenience
pub use generic::ApiServer;
// Re-export ApiResponse for testing
#[allow(unused_imports)]
pub use generic::ApiResponse;
