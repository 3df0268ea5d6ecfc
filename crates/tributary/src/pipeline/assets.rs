//! Cached lookup of a peer connection's assets.

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::CatalogClient;
use crate::config::PeerConfig;
use crate::error::CatalogError;
use tributary_core::cache::QueryCache;
use tributary_core::emit;
use tributary_core::metrics::events::{CacheLookup, CacheLookupResult};
use tributary_core::types::AssetRecord;

/// Every asset under the peer's connection, served from cache when fresh.
///
/// A missing connection yields an empty list and leaves the cache alone.
/// Cache write failures are logged; the fetched assets are still returned.
pub(crate) async fn fetch_peer_assets(
    catalog: &dyn CatalogClient,
    cache: &QueryCache,
    ttl: Duration,
    peer: &PeerConfig,
    force_refresh: bool,
) -> Result<Vec<AssetRecord>, CatalogError> {
    let cache_name = peer.cache_name();

    let lookup = if force_refresh {
        CacheLookupResult::Bypassed
    } else {
        match cache.load(&cache_name) {
            Some(entry) if entry.is_fresh_at(ttl, Utc::now()) => {
                emit!(CacheLookup {
                    cache: cache_name.clone(),
                    result: CacheLookupResult::Hit,
                });
                info!(
                    connection = %peer.connection,
                    cache = %cache_name,
                    items = entry.data.len(),
                    "Using cached assets"
                );
                return Ok(entry.data);
            }
            Some(_) => CacheLookupResult::Stale,
            None => CacheLookupResult::Miss,
        }
    };

    emit!(CacheLookup {
        cache: cache_name.clone(),
        result: lookup,
    });
    debug!(cache = %cache_name, result = lookup.as_str(), "Fetching assets from catalog");

    let Some(connection_qn) = catalog
        .find_connection(&peer.connection, &peer.connector)
        .await?
    else {
        warn!(
            connection = %peer.connection,
            connector = %peer.connector,
            "Connection not found in catalog; no assets to link"
        );
        return Ok(Vec::new());
    };

    let assets = catalog.search_prefix(&connection_qn).await?;
    info!(
        connection = %peer.connection,
        qualified_name = %connection_qn,
        assets = assets.len(),
        "Fetched assets"
    );

    if let Err(e) = cache.save(&assets, &cache_name) {
        warn!(cache = %cache_name, error = %e, "Cache not updated");
    }

    Ok(assets)
}

/// Assets of the configured type, in their original order.
pub(crate) fn filter_type(assets: Vec<AssetRecord>, type_name: &str) -> Vec<AssetRecord> {
    assets
        .into_iter()
        .filter(|asset| asset.type_name == type_name)
        .collect()
}
