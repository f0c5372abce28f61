//! Mapping document loading
//!
//! Documents are fetched from the filesystem, over HTTP(S), or taken from
//! inline JSON. Multiple documents are loaded in order and merged; a document
//! that fails to load is logged and skipped as long as at least one succeeds.

use std::fmt;
use std::path::{Path, PathBuf};

use super::{MappingDocument, MappingLoadError};

/// Where a mapping document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    /// A file on disk
    Path(PathBuf),
    /// An `http(s)://` location
    Url(String),
    /// JSON text with a display name
    Inline { name: String, json: String },
}

impl MappingSource {
    /// Interpret a location string: `http(s)://` is a URL, text starting with
    /// `{` is inline JSON, anything else is a filesystem path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            MappingSource::Url(trimmed.to_string())
        } else if trimmed.starts_with('{') {
            MappingSource::Inline {
                name: "<inline>".to_string(),
                json: trimmed.to_string(),
            }
        } else {
            MappingSource::Path(PathBuf::from(trimmed))
        }
    }

    /// Inline JSON with a display name for logs
    pub fn inline(name: impl Into<String>, json: impl Into<String>) -> Self {
        MappingSource::Inline {
            name: name.into(),
            json: json.into(),
        }
    }

    /// Human-readable location used in logs and errors
    pub fn location(&self) -> String {
        match self {
            MappingSource::Path(path) => path.display().to_string(),
            MappingSource::Url(url) => url.clone(),
            MappingSource::Inline { name, .. } => name.clone(),
        }
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<MappingDocument, MappingLoadError> {
        let location = self.location();
        let text = match self {
            MappingSource::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| MappingLoadError::Io {
                        location: location.clone(),
                        message: e.to_string(),
                    })?
            }
            MappingSource::Url(url) => fetch_url(client, url).await?,
            MappingSource::Inline { json, .. } => json.clone(),
        };
        MappingDocument::from_json(&text, &location)
    }
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location())
    }
}

impl From<&str> for MappingSource {
    fn from(location: &str) -> Self {
        MappingSource::parse(location)
    }
}

impl From<String> for MappingSource {
    fn from(location: String) -> Self {
        MappingSource::parse(&location)
    }
}

impl From<PathBuf> for MappingSource {
    fn from(path: PathBuf) -> Self {
        MappingSource::Path(path)
    }
}

impl From<&Path> for MappingSource {
    fn from(path: &Path) -> Self {
        MappingSource::Path(path.to_path_buf())
    }
}

async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<String, MappingLoadError> {
    let http_err = |message: String| MappingLoadError::Http {
        location: url.to_string(),
        message,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| http_err(e.to_string()))?;

    if !response.status().is_success() {
        return Err(http_err(format!("request failed: {}", response.status())));
    }

    response.text().await.map_err(|e| http_err(e.to_string()))
}

/// Loads and merges mapping documents
pub struct MappingLoader {
    client: reqwest::Client,
}

impl Default for MappingLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingLoader {
    /// A loader with its own HTTP client
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fwmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        MappingLoader { client }
    }

    /// Load a single document
    pub async fn load_one(&self, source: &MappingSource) -> Result<MappingDocument, MappingLoadError> {
        source.fetch(&self.client).await
    }

    /// Load every source in order and merge them (later sources win).
    ///
    /// Fails only when nothing loads. With a single source its own error is
    /// returned; with several, [`MappingLoadError::NoDocuments`].
    pub async fn load(&self, sources: &[MappingSource]) -> Result<MappingDocument, MappingLoadError> {
        let mut loaded = Vec::with_capacity(sources.len());
        let mut last_error = None;

        for source in sources {
            match source.fetch(&self.client).await {
                Ok(doc) => {
                    tracing::info!(
                        "Loaded mapping '{}' ({} fields)",
                        source.location(),
                        doc.field_count()
                    );
                    loaded.push(doc);
                }
                Err(e) => {
                    tracing::warn!("Skipping mapping '{}': {}", source.location(), e);
                    last_error = Some(e);
                }
            }
        }

        if loaded.is_empty() {
            return Err(match last_error {
                Some(e) if sources.len() == 1 => e,
                _ => MappingLoadError::NoDocuments,
            });
        }

        let merged = MappingDocument::merged(loaded);
        tracing::info!(
            "Merged {} mapping document(s): {} categories, {} fields",
            sources.len(),
            merged.categories.len(),
            merged.field_count()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        assert_eq!(
            MappingSource::parse("https://example.com/map.json"),
            MappingSource::Url("https://example.com/map.json".into())
        );
        assert_eq!(
            MappingSource::parse("maps/th3d.json"),
            MappingSource::Path(PathBuf::from("maps/th3d.json"))
        );
        assert!(matches!(
            MappingSource::parse(r#"{"basic": {}}"#),
            MappingSource::Inline { .. }
        ));
    }

    #[tokio::test]
    async fn test_single_failure_reports_cause() {
        let loader = MappingLoader::new();
        let err = loader
            .load(&[MappingSource::inline("broken", "{ nope")])
            .await
            .unwrap_err();
        assert!(matches!(err, MappingLoadError::Json { .. }));
    }

    #[tokio::test]
    async fn test_partial_failure_is_skipped() {
        let loader = MappingLoader::new();
        let doc = loader
            .load(&[
                MappingSource::Path(PathBuf::from("/definitely/not/here.json")),
                MappingSource::inline("ok", r#"{"basic": {"name": {"mapsFrom": "NAME"}}}"#),
            ])
            .await
            .unwrap();
        assert_eq!(doc.field_count(), 1);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let loader = MappingLoader::new();
        let err = loader
            .load(&[
                MappingSource::inline("a", "[]"),
                MappingSource::inline("b", "nope"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, MappingLoadError::NoDocuments));

        let err = loader.load(&[]).await.unwrap_err();
        assert!(matches!(err, MappingLoadError::NoDocuments));
    }
}
