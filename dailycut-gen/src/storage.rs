//! Filesystem asset store
//!
//! Stores generated audio and artwork under the root folder and hands
//! out stable relative refs. This is the boundary behind which real
//! object storage would sit; the rest of the service only ever sees
//! refs.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Ref used when image generation is exhausted and the album falls
/// back to fixed artwork
pub const DEFAULT_ARTWORK_REF: &str = "assets/artwork/default_vinyl.png";

#[derive(Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    /// Open the store, creating the asset directories if missing
    pub fn open(root: &Path) -> Result<Self> {
        for dir in ["assets/audio", "assets/artwork"] {
            std::fs::create_dir_all(root.join(dir))
                .with_context(|| format!("failed to create {}", dir))?;
        }
        Ok(Self { root: root.to_path_buf() })
    }

    /// Store synthesized audio; returns its ref
    pub async fn store_audio(
        &self,
        owner_id: Uuid,
        filename: &str,
        data: &[u8],
    ) -> Result<String> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let safe_name = sanitize_filename(filename);
        let asset_ref = format!("assets/audio/{}_{}_{}", owner_id, timestamp, safe_name);

        self.write(&asset_ref, data).await?;
        tracing::info!(asset_ref = %asset_ref, bytes = data.len(), "Audio stored");

        Ok(asset_ref)
    }

    /// Store vinyl disk artwork for an owner's week; returns its ref
    pub async fn store_artwork(
        &self,
        owner_id: Uuid,
        week_start: chrono::NaiveDate,
        data: &[u8],
    ) -> Result<String> {
        let asset_ref = format!("assets/artwork/{}_{}_vinyl.png", owner_id, week_start);

        self.write(&asset_ref, data).await?;
        tracing::info!(asset_ref = %asset_ref, bytes = data.len(), "Artwork stored");

        Ok(asset_ref)
    }

    /// Absolute path of a stored asset
    pub fn resolve(&self, asset_ref: &str) -> PathBuf {
        self.root.join(asset_ref)
    }

    async fn write(&self, asset_ref: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(asset_ref);
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("failed to write asset {}", asset_ref))?;
        Ok(())
    }
}

/// Keep asset filenames to a safe character set
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "song.wav".to_string()
    } else {
        cleaned
    }
}
