// src/deliver/mod.rs
//! Delivery gate: package, validate, transmit, and always clean up.

pub mod epub;
pub mod mail;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::digest::DocMeta;
use epub::EpubConverter;
use mail::MailTransport;

pub const MAX_ARTIFACT_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { bytes: u64 },
    /// Converter produced nothing; transmission skipped.
    SkippedEmpty,
    /// Artifact over the mail-size ceiling; transmission skipped.
    SkippedOversize { bytes: u64 },
}

/// Package `document` and hand it to the transport.
///
/// The staging directory owns every intermediate file and the artifact
/// itself; dropping it deletes them on success, failure, and panic alike.
/// A converter or transport error propagates, but the staging directory
/// still goes with it.
pub async fn deliver(
    document: &str,
    meta: &DocMeta,
    converter: &dyn EpubConverter,
    transport: &dyn MailTransport,
) -> Result<DeliveryOutcome> {
    let staging = tempfile::tempdir().context("creating staging dir")?;
    let html_path = staging.path().join("digest.html");
    tokio::fs::write(&html_path, document)
        .await
        .context("writing staged document")?;

    let stamp = Utc::now().format("%Y-%m-%d");
    let slug: String = meta
        .title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let artifact = staging.path().join(format!("{slug}-{stamp}.epub"));

    converter
        .convert(&html_path, &artifact, meta)
        .await
        .with_context(|| format!("packaging via {}", converter.name()))?;

    let bytes = tokio::fs::metadata(&artifact)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if bytes == 0 {
        tracing::error!("artifact is empty; skipping transmission");
        return Ok(DeliveryOutcome::SkippedEmpty);
    }
    if bytes > MAX_ARTIFACT_BYTES {
        tracing::error!(bytes, "artifact exceeds 50 MB; skipping transmission");
        return Ok(DeliveryOutcome::SkippedOversize { bytes });
    }

    transport
        .send_artifact(&meta.title, "Your daily news.", &artifact)
        .await
        .context("transmitting artifact")?;
    tracing::info!(bytes, "artifact transmitted");
    Ok(DeliveryOutcome::Sent { bytes })
}
