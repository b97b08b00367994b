use crate::models::{PropertyListing, FIELD_NAMES};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// File format picked from the output path's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

/// Serializes listings as CSV with a header row, even when there are none
pub fn to_csv(listings: &[PropertyListing]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(FIELD_NAMES)?;
    for listing in listings {
        writer
            .serialize(listing)
            .with_context(|| format!("Failed to serialize listing {}", listing.listing_id))?;
    }
    writer.into_inner().context("Failed to flush CSV buffer")
}

/// Writes listings to `path`, creating parent directories as needed
pub async fn write_listings(path: &Path, listings: &[PropertyListing]) -> Result<()> {
    let format = OutputFormat::from_path(path);
    let bytes = match format {
        OutputFormat::Csv => to_csv(listings)?,
        OutputFormat::Json => serde_json::to_vec_pretty(listings)?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), count = listings.len(), ?format, "Saved listings");
    Ok(())
}
