//! EPUB packaging via external converters.
//!
//! Two-tier fallback: calibre's `ebook-convert` is preferred (it produces
//! the EPUB2 output older Kindles want); `pandoc` is the always-available
//! second choice. Availability is probed at call time, so installing
//! calibre mid-run is picked up on the next cycle.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::digest::DocMeta;

#[async_trait]
pub trait EpubConverter: Send + Sync {
    /// Convert the HTML document at `input` into an EPUB at `output`.
    async fn convert(&self, input: &Path, output: &Path, meta: &DocMeta) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// calibre `ebook-convert`, plus a best-effort `ebook-meta` pass.
pub struct CalibreConverter {
    convert_bin: PathBuf,
    meta_bin: Option<PathBuf>,
}

impl CalibreConverter {
    pub fn from_path() -> Option<Self> {
        let convert_bin = which::which("ebook-convert").ok()?;
        Some(Self {
            convert_bin,
            meta_bin: which::which("ebook-meta").ok(),
        })
    }
}

#[async_trait]
impl EpubConverter for CalibreConverter {
    async fn convert(&self, input: &Path, output: &Path, meta: &DocMeta) -> Result<()> {
        let status = Command::new(&self.convert_bin)
            .arg(input)
            .arg(output)
            .args(["--input-encoding", "utf-8"])
            .args(["--epub-version", "2"])
            .arg("--no-default-epub-cover")
            .args(["--title", &meta.title])
            .args(["--authors", &meta.author])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .context("running ebook-convert")?;
        if !status.success() {
            bail!("ebook-convert exited with {status}");
        }

        if let Some(meta_bin) = &self.meta_bin {
            let _ = Command::new(meta_bin)
                .arg(output)
                .args(["--title", &meta.title])
                .args(["--authors", &meta.author])
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "calibre"
    }
}

/// pandoc fallback; functionally plainer output but always installable.
pub struct PandocConverter {
    binary: PathBuf,
}

impl PandocConverter {
    /// `PANDOC_PATH` wins over PATH discovery.
    pub fn from_path() -> Option<Self> {
        if let Ok(p) = std::env::var("PANDOC_PATH") {
            let p = PathBuf::from(p);
            if p.exists() {
                return Some(Self { binary: p });
            }
        }
        which::which("pandoc").ok().map(|binary| Self { binary })
    }
}

#[async_trait]
impl EpubConverter for PandocConverter {
    async fn convert(&self, input: &Path, output: &Path, meta: &DocMeta) -> Result<()> {
        let status = Command::new(&self.binary)
            .arg(input)
            .args(["--from", "html", "--to", "epub"])
            .arg("--output")
            .arg(output)
            .arg("--standalone")
            .arg("--toc")
            .arg(format!("--metadata=title:{}", meta.title))
            .arg(format!("--metadata=author:{}", meta.author))
            .arg("--metadata=language:en-GB")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .context("running pandoc")?;
        if !status.success() {
            bail!("pandoc exited with {status}");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pandoc"
    }
}

/// Pick the first available converter, preferred tier first.
pub fn resolve_converter() -> Result<Box<dyn EpubConverter>> {
    if let Some(c) = CalibreConverter::from_path() {
        tracing::debug!("using calibre for EPUB packaging");
        return Ok(Box::new(c));
    }
    if let Some(c) = PandocConverter::from_path() {
        tracing::debug!("using pandoc for EPUB packaging");
        return Ok(Box::new(c));
    }
    Err(anyhow!(
        "no EPUB converter found: install calibre (ebook-convert) or pandoc"
    ))
}
