// src/config.rs
//! Runtime configuration: environment variables (loaded via dotenvy in
//! `main`) layered over an optional `digest.toml`, plus the line-oriented
//! feed and calendar lists.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_CONFIG_DIR: &str = "DIGEST_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "config";

#[derive(Debug, Clone)]
pub struct Settings {
    pub doc_title: String,
    pub doc_author: String,
    /// Sleep between cycles.
    pub period: Duration,

    pub latitude: f64,
    pub longitude: f64,
    pub location_label: String,
    /// Local display offset from UTC, minutes.
    pub utc_offset_minutes: i32,

    pub feed_urls: Vec<String>,
    pub calendar_urls: Vec<String>,
    /// Marker file whose mtime is the cycle cursor.
    pub cursor_path: PathBuf,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    document: DocumentSection,
    #[serde(default)]
    location: LocationSection,
    #[serde(default)]
    schedule: ScheduleSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DocumentSection {
    title: String,
    author: String,
}

impl Default for DocumentSection {
    fn default() -> Self {
        Self {
            title: "Daily News".into(),
            author: "Kindle Digest".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LocationSection {
    latitude: f64,
    longitude: f64,
    label: String,
    utc_offset_minutes: i32,
}

impl Default for LocationSection {
    fn default() -> Self {
        // Cardiff.
        Self {
            latitude: 51.4816,
            longitude: -3.1791,
            label: "Cardiff, UK".into(),
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ScheduleSection {
    period_minutes: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self { period_minutes: 12 }
    }
}

fn env_or<F: FnOnce() -> String>(key: &str, fallback: F) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback(),
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let dir = PathBuf::from(
            std::env::var(ENV_CONFIG_DIR).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string()),
        );
        Self::load_from_dir(&dir)
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let file_cfg = read_file_config(&dir.join("digest.toml"))?;

        let feeds_path = dir.join("feeds.txt");
        let feed_urls = load_list(&feeds_path);
        let calendar_urls = load_list(&dir.join("calendars.txt"));

        let period_minutes = match std::env::var("UPDATE_PERIOD") {
            Ok(v) => v
                .parse::<u64>()
                .with_context(|| format!("UPDATE_PERIOD is not a number: {v:?}"))?,
            Err(_) => file_cfg.schedule.period_minutes,
        };

        Ok(Self {
            doc_title: env_or("DOC_TITLE", || file_cfg.document.title.clone()),
            doc_author: env_or("DOC_AUTHOR", || file_cfg.document.author.clone()),
            period: Duration::from_secs(period_minutes * 60),
            latitude: file_cfg.location.latitude,
            longitude: file_cfg.location.longitude,
            location_label: file_cfg.location.label.clone(),
            utc_offset_minutes: file_cfg.location.utc_offset_minutes,
            feed_urls,
            calendar_urls,
            // The feed list doubles as the cursor marker, as its mtime.
            cursor_path: feeds_path,
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            openai_model: env_or("OPENAI_MODEL", || "gpt-4o-mini".to_string()),
        })
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// One entry per line; blank lines and `#` comments skipped.
pub fn load_list(path: &Path) -> Vec<String> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// SMTP submission settings; all required pieces come from the environment.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl MailSettings {
    pub fn from_env() -> Result<Self> {
        let user = std::env::var("EMAIL_USER").context("EMAIL_USER missing")?;
        let password = std::env::var("EMAIL_PASSWORD").context("EMAIL_PASSWORD missing")?;
        let to = std::env::var("KINDLE_EMAIL").context("KINDLE_EMAIL missing")?;
        let host = env_or("EMAIL_SMTP", || "smtp.gmail.com".to_string());
        let port = match std::env::var("EMAIL_SMTP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("EMAIL_SMTP_PORT is not a port: {v:?}"))?,
            Err(_) => 587,
        };
        let from = env_or("EMAIL_FROM", || user.clone());
        Ok(Self {
            host,
            port,
            user,
            password,
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn list_loader_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.txt");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "  https://example.test/feed.xml  ").unwrap();
        writeln!(f, "https://example.test/other.xml").unwrap();

        let urls = load_list(&path);
        assert_eq!(
            urls,
            vec![
                "https://example.test/feed.xml".to_string(),
                "https://example.test/other.xml".to_string(),
            ]
        );
    }

    #[test]
    fn missing_list_file_means_empty() {
        assert!(load_list(Path::new("/nonexistent/feeds.txt")).is_empty());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("digest.toml"),
            r#"
[document]
title = "Morning Papers"
author = "Robot"

[location]
latitude = 48.85
longitude = 2.35
label = "Paris, FR"
utc_offset_minutes = 60

[schedule]
period_minutes = 30
"#,
        )
        .unwrap();

        let cfg = read_file_config(&dir.path().join("digest.toml")).unwrap();
        assert_eq!(cfg.document.title, "Morning Papers");
        assert_eq!(cfg.location.label, "Paris, FR");
        assert_eq!(cfg.schedule.period_minutes, 30);
    }

    #[serial_test::serial]
    #[test]
    fn env_wins_over_toml_for_document_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("digest.toml"),
            "[document]\ntitle = \"From File\"\nauthor = \"File Author\"\n",
        )
        .unwrap();

        std::env::set_var("DOC_TITLE", "From Env");
        std::env::remove_var("DOC_AUTHOR");
        std::env::remove_var("UPDATE_PERIOD");
        let settings = Settings::load_from_dir(dir.path()).unwrap();
        std::env::remove_var("DOC_TITLE");

        assert_eq!(settings.doc_title, "From Env");
        assert_eq!(settings.doc_author, "File Author");
        assert_eq!(settings.period.as_secs(), 12 * 60);
        assert_eq!(settings.cursor_path, dir.path().join("feeds.txt"));
    }

    #[test]
    fn absent_toml_falls_back_to_defaults() {
        let cfg = read_file_config(Path::new("/nonexistent/digest.toml")).unwrap();
        assert_eq!(cfg.document.title, "Daily News");
        assert_eq!(cfg.location.utc_offset_minutes, 0);
        assert_eq!(cfg.schedule.period_minutes, 12);
    }
}
