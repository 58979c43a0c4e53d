use flate2::read::MultiGzDecoder;
use std::io::Read;

use crate::errors::{SourceError, SourceResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression formats a feed may arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Uncompressed,
}

/// Gzip detection and decompression for downloaded feeds
pub struct DecompressionService;

impl DecompressionService {
    /// Detect compression format using magic bytes
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        if data.len() >= 2 && data[..2] == GZIP_MAGIC {
            CompressionFormat::Gzip
        } else {
            CompressionFormat::Uncompressed
        }
    }

    /// Whether the URL path names a gzip file (`.gz` suffix, query ignored)
    pub fn url_indicates_gzip(url: &str) -> bool {
        if url.ends_with(".gz") {
            return true;
        }
        url::Url::parse(url)
            .map(|parsed| parsed.path().ends_with(".gz"))
            .unwrap_or(false)
    }

    /// Choose the format from the URL and the content.
    ///
    /// Both signals are evaluated; either one is enough to select gzip.
    pub fn resolve_format(url: &str, data: &[u8]) -> CompressionFormat {
        let by_url = Self::url_indicates_gzip(url);
        let by_content = Self::detect_compression_format(data) == CompressionFormat::Gzip;
        if by_url || by_content {
            CompressionFormat::Gzip
        } else {
            CompressionFormat::Uncompressed
        }
    }

    pub fn decompress(format: CompressionFormat, data: &[u8]) -> SourceResult<Vec<u8>> {
        match format {
            CompressionFormat::Gzip => Self::decompress_gzip(data),
            CompressionFormat::Uncompressed => Ok(data.to_vec()),
        }
    }

    /// Decompress gzip data, including multi-member streams
    fn decompress_gzip(data: &[u8]) -> SourceResult<Vec<u8>> {
        let mut decoder = MultiGzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SourceError::decompression(format!("gzip: {e}")))?;
        Ok(decompressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_detect_uncompressed() {
        let format = DecompressionService::detect_compression_format(b"<tv></tv>");
        assert_eq!(format, CompressionFormat::Uncompressed);
        assert_eq!(
            DecompressionService::detect_compression_format(&[0x1f]),
            CompressionFormat::Uncompressed
        );
    }

    #[test]
    fn test_detect_and_decompress_gzip() {
        let original = b"<tv><channel id=\"1\"/></tv>";
        let compressed = gzip(original);

        let format = DecompressionService::resolve_format("http://host/guide", &compressed);
        assert_eq!(format, CompressionFormat::Gzip);

        let decompressed = DecompressionService::decompress(format, &compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_url_suffix_selects_gzip_without_magic() {
        assert!(DecompressionService::url_indicates_gzip("http://h/epg.xml.gz"));
        assert!(DecompressionService::url_indicates_gzip(
            "http://h/epg.xml.gz?token=abc"
        ));
        assert!(!DecompressionService::url_indicates_gzip("http://h/epg.xml"));

        let format = DecompressionService::resolve_format("http://h/epg.xml.gz", b"<tv/>");
        assert_eq!(format, CompressionFormat::Gzip);
        assert!(DecompressionService::decompress(format, b"<tv/>").is_err());
    }
}
