use crate::service::ImageService;
use crate::ImageError;
use serde::{Deserialize, Serialize};
use tracing::info;
use vitrine_core::sha256_hex;
use vitrine_model::{ImageSlot, ProductId};

/// One image field as extracted from an origin record listing: which slot
/// it fills, the download token, and whatever the origin said about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginImageDescriptor {
    pub slot: ImageSlot,
    pub origin_token: String,
    pub original_name: String,
    /// Advisory size from the origin listing; the stored size comes from
    /// the bytes actually downloaded.
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginSlotOutcome {
    pub slot: ImageSlot,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginBatchReport {
    pub downloaded: u32,
    pub skipped: u32,
    pub failed: u32,
    pub outcomes: Vec<OriginSlotOutcome>,
}

impl ImageService {
    /// Walks one product's origin image descriptors, downloading what is
    /// new and skipping what is already held: a slot whose asset carries
    /// the same origin token is skipped without a download, and a download
    /// whose bytes hash to the stored content is skipped without a rewrite.
    /// Per-slot failures are reported, not fatal.
    pub async fn ingest_product_from_origin(
        &self,
        product_id: &ProductId,
        descriptors: &[OriginImageDescriptor],
    ) -> Result<OriginBatchReport, ImageError> {
        let mut report = OriginBatchReport::default();
        for descriptor in descriptors {
            let existing = self
                .assets
                .find_by_product_slot(product_id, descriptor.slot)
                .await?;
            if let Some(existing) = &existing {
                if existing.origin_token.as_deref() == Some(descriptor.origin_token.as_str())
                    && existing.file_exists
                {
                    report.skipped += 1;
                    report.outcomes.push(OriginSlotOutcome {
                        slot: descriptor.slot,
                        status: "skipped".to_string(),
                        asset_id: Some(existing.asset_id.clone()),
                        error: None,
                    });
                    continue;
                }
            }

            let bytes = match self.origin_bytes(&descriptor.origin_token).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    report.failed += 1;
                    report.outcomes.push(OriginSlotOutcome {
                        slot: descriptor.slot,
                        status: "failed".to_string(),
                        asset_id: None,
                        error: Some(err.to_string()),
                    });
                    continue;
                }
            };
            if let Some(existing) = &existing {
                if existing.content_hash == sha256_hex(&bytes) && existing.file_exists {
                    report.skipped += 1;
                    report.outcomes.push(OriginSlotOutcome {
                        slot: descriptor.slot,
                        status: "skipped".to_string(),
                        asset_id: Some(existing.asset_id.clone()),
                        error: None,
                    });
                    continue;
                }
            }

            let request = crate::IngestRequest {
                product_id: product_id.clone(),
                slot: descriptor.slot,
                bytes,
                original_name: descriptor.original_name.clone(),
                mime_type: None,
            };
            match self
                .ingest_inner(
                    request,
                    vitrine_model::AssetSource::Origin,
                    Some(descriptor.origin_token.clone()),
                )
                .await
            {
                Ok(asset) => {
                    report.downloaded += 1;
                    report.outcomes.push(OriginSlotOutcome {
                        slot: descriptor.slot,
                        status: "downloaded".to_string(),
                        asset_id: Some(asset.asset_id),
                        error: None,
                    });
                }
                Err(err) => {
                    report.failed += 1;
                    report.outcomes.push(OriginSlotOutcome {
                        slot: descriptor.slot,
                        status: "failed".to_string(),
                        asset_id: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        info!(
            product_id = %product_id,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "origin batch ingest complete"
        );
        Ok(report)
    }

    async fn origin_bytes(&self, token: &str) -> Result<Vec<u8>, ImageError> {
        Ok(self.origin.download(token).await?)
    }
}
