use crate::service::ImageService;
use crate::ImageError;
use tracing::debug;
use vitrine_model::{CheckIssues, ConsistencyCheck, ProductId};

impl ImageService {
    /// Read-only comparison of a product's slot references against the
    /// asset records and storage reality. Expected drift comes back as
    /// issue flags, never as an error; only infrastructure failures
    /// (repository or store unreachable) propagate.
    pub async fn check(&self, product_id: &ProductId) -> Result<Vec<ConsistencyCheck>, ImageError> {
        let Some(product) = self.products.get(product_id).await? else {
            let issues = CheckIssues {
                product_record_missing: true,
                ..CheckIssues::default()
            };
            return Ok(vec![ConsistencyCheck::new(product_id.clone(), None, issues)]);
        };

        let mut checks = Vec::new();
        for (slot, reference) in &product.images {
            let mut issues = CheckIssues::default();
            match self.assets.find_by_product_slot(product_id, *slot).await? {
                None => issues.image_record_missing = true,
                Some(asset) => {
                    match self.store.stat(&asset.bucket, &asset.object_key).await {
                        Ok(_) => {}
                        Err(err) if err.is_not_found() => issues.file_not_exists = true,
                        // An unreachable store is not drift; report it
                        // upward instead of inventing an issue.
                        Err(err) => return Err(err.into()),
                    }
                    if reference.url() != asset.public_url {
                        issues.url_mismatch = true;
                    }
                    if let Some(embedded) = reference.asset_id() {
                        if embedded != asset.asset_id {
                            issues.metadata_mismatch = true;
                        }
                    }
                }
            }
            if issues.any() {
                debug!(
                    product_id = %product_id,
                    slot = %slot,
                    ?issues,
                    "consistency drift detected"
                );
            }
            checks.push(ConsistencyCheck::new(product_id.clone(), Some(*slot), issues));
        }
        Ok(checks)
    }
}
