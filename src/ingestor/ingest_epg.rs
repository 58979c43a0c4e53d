use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::DocumentFetcher;
use crate::config::FetchConfig;
use crate::errors::{AppError, AppResult, SourceError, SourceResult};
use crate::utils::{CompressionFormat, DecompressionService};
use crate::xmltv::XmltvDocument;

/// HTTP document fetcher for XMLTV feeds (plain or gzip-compressed)
pub struct EpgIngestor {
    client: Client,
}

impl EpgIngestor {
    pub fn new(config: &FetchConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_timeout(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> SourceResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| request_error(url, e))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DocumentFetcher for EpgIngestor {
    async fn fetch(&self, url: &str) -> SourceResult<XmltvDocument> {
        info!("Fetching XMLTV data from: {}", url);

        let body = match self.download(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error fetching {}: {}", url, e);
                return Err(e);
            }
        };
        debug!("Downloaded XMLTV content ({} bytes)", body.len());

        let owned_url = url.to_string();
        let decoded = tokio::task::spawn_blocking(move || decode_document(&owned_url, &body))
            .await
            .map_err(|e| SourceError::network(url, format!("decode task failed: {e}")))?;

        match decoded {
            Ok(document) => {
                info!(
                    "Parsed {} channels and {} programmes from {}",
                    document.channel_count(),
                    document.programme_count(),
                    url
                );
                Ok(document)
            }
            Err(e) => {
                warn!("Error parsing {}: {}", url, e);
                Err(e)
            }
        }
    }
}

/// Decompress (when the URL or the content says gzip) and parse a downloaded body
pub fn decode_document(url: &str, body: &[u8]) -> SourceResult<XmltvDocument> {
    let format = DecompressionService::resolve_format(url, body);
    if format == CompressionFormat::Gzip {
        debug!("Decompressing gzip content from {}", url);
    }
    let content = DecompressionService::decompress(format, body)?;
    Ok(XmltvDocument::parse(&content)?)
}

fn request_error(url: &str, error: reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::timeout(url)
    } else {
        SourceError::network(url, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const FEED: &str = r#"<tv><channel id="a"/><programme channel="a"/></tv>"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_plain_and_compressed() {
        let plain = decode_document("http://h/epg.xml", FEED.as_bytes()).unwrap();
        assert_eq!(plain.channel_count(), 1);

        let by_suffix = decode_document("http://h/epg.xml.gz", &gzip(FEED.as_bytes())).unwrap();
        assert_eq!(by_suffix.programme_count(), 1);

        let by_magic = decode_document("http://h/epg", &gzip(FEED.as_bytes())).unwrap();
        assert_eq!(by_magic, plain);
    }

    #[test]
    fn test_decode_failures_are_values() {
        assert!(matches!(
            decode_document("http://h/epg.xml.gz", FEED.as_bytes()),
            Err(SourceError::Decompression { .. })
        ));
        assert!(matches!(
            decode_document("http://h/epg.xml", b"<tv><channel>"),
            Err(SourceError::InvalidDocument(_))
        ));
        assert!(matches!(
            decode_document("http://h/epg", &gzip(b"<tv>")),
            Err(SourceError::InvalidDocument(_))
        ));
    }
}
