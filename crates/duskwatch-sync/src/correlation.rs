//! Cross-node correlation: a thin pass-through over the hub store's own
//! grouped query, kept as a separate module so the codec's public surface
//! doesn't conflate "decode a package" with "query across packages".

use duskwatch_store::HubStore;
use duskwatch_types::TechniqueCorrelation;

use crate::error::SyncResult;

pub async fn correlate_techniques<H: HubStore>(store: &H) -> SyncResult<Vec<TechniqueCorrelation>> {
    Ok(store.correlate_techniques().await?)
}
