//! Provider adapters.
//!
//! Each adapter turns one [`ProviderClient::fetch`](crate::ProviderClient)
//! into exactly one logical upstream request. Credentials are handed in at
//! construction; nothing here reads the process environment.

mod bitquery;
mod fixture;
mod gmgn;
mod moralis;

pub use bitquery::{
    BitqueryHoldersClient, BitqueryTradesClient, BitqueryTransfersClient, BITQUERY_STREAMING_URL,
};
pub use fixture::StaticProviderClient;
pub use gmgn::{GmgnPageClient, GMGN_BASE_URL};
pub use moralis::{MoralisPairStatsClient, MORALIS_BASE_URL};

use crate::http_client::{HttpClient, HttpRequest};
use crate::{ProviderResult, SourceError};

/// Sends `request` and returns the 2xx body.
async fn send(http_client: &dyn HttpClient, request: HttpRequest) -> ProviderResult<String> {
    let response = http_client.execute(request).await?.ensure_success()?;
    Ok(response.body)
}

/// Decodes a response body as JSON. A body that does not parse is a local
/// fault, not a schema mismatch.
fn decode_json(provider: &str, body: &str) -> ProviderResult<serde_json::Value> {
    serde_json::from_str(body).map_err(|error| {
        SourceError::transport(format!("{provider} returned a body that is not JSON: {error}"))
    })
}
