//! Compression codec layer.
//!
//! # Data Flow
//! ```text
//! Origin fetch:
//!     upstream Content-Encoding → ContentCoding::from_headers
//!     → decode (whole body into memory) → transform pipeline
//!
//! Cache hit:
//!     client Accept-Encoding → negotiate (br > gzip > identity)
//!     → encode (finished writer) → response body
//! ```
//!
//! # Design Decisions
//! - Whole-body, in-memory: the transform pipeline edits bytes and needs all of them
//! - Unknown upstream codings pass through untouched
//! - Origin GETs only advertise codings this module can decode
//! - Encoders are finished explicitly; a failed finish is an error, never a truncated body

use std::io::{Cursor, Read, Write};

use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use axum::http::{HeaderMap, HeaderValue};
use brotli::enc::BrotliEncoderParams;
use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::GzEncoder;
use flate2::Compression;

/// Brotli quality used on the serve path.
const BROTLI_QUALITY: i32 = 5;

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Errors from decoding upstream bodies or encoding cached ones.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode {coding} body: {source}")]
    Decode {
        coding: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {coding} body: {source}")]
    Encode {
        coding: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A content coding understood by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Identity,
    Gzip,
    /// Raw deflate stream (no zlib header).
    Deflate,
    Brotli,
}

impl ContentCoding {
    /// Parse a single Content-Encoding token. Unknown tokens are identity.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => ContentCoding::Gzip,
            "deflate" => ContentCoding::Deflate,
            "br" => ContentCoding::Brotli,
            _ => ContentCoding::Identity,
        }
    }

    /// Coding of a response, from its Content-Encoding header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_token)
            .unwrap_or(ContentCoding::Identity)
    }

    /// Value for the Content-Encoding header, `None` for identity.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            ContentCoding::Identity => None,
            other => Some(other.as_str()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCoding::Identity => "identity",
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
            ContentCoding::Brotli => "br",
        }
    }
}

/// Pick the response coding from a client's Accept-Encoding header.
///
/// Preference is brotli, then gzip, then identity. Entries with `q=0` are
/// treated as refused.
pub fn negotiate(headers: &HeaderMap) -> ContentCoding {
    let Some(accept) = headers.get(ACCEPT_ENCODING).and_then(|v| v.to_str().ok()) else {
        return ContentCoding::Identity;
    };

    let mut brotli = false;
    let mut gzip = false;
    for entry in accept.split(',') {
        let mut parts = entry.split(';');
        let name = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let refused = parts.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        if refused {
            continue;
        }
        match name.as_str() {
            "br" => brotli = true,
            "gzip" => gzip = true,
            _ => {}
        }
    }

    if brotli {
        ContentCoding::Brotli
    } else if gzip {
        ContentCoding::Gzip
    } else {
        ContentCoding::Identity
    }
}

/// Codings the origin may use for a GET this proxy might cache.
const DECODABLE: [&str; 5] = ["gzip", "x-gzip", "deflate", "br", "identity"];

/// Drop Accept-Encoding entries naming codings [`decode`] cannot handle.
///
/// The client's preferences and q-values are kept for the rest. When no
/// entry survives the header is removed and the origin answers identity.
pub fn restrict_accept_encoding(headers: &mut HeaderMap) {
    let Some(accept) = headers.get(ACCEPT_ENCODING).and_then(|v| v.to_str().ok()) else {
        headers.remove(ACCEPT_ENCODING);
        return;
    };

    let kept: Vec<&str> = accept
        .split(',')
        .map(str::trim)
        .filter(|entry| {
            let name = entry.split(';').next().unwrap_or("").trim();
            DECODABLE.iter().any(|d| d.eq_ignore_ascii_case(name))
        })
        .collect();

    match HeaderValue::from_str(&kept.join(", ")) {
        Ok(value) if !kept.is_empty() => {
            headers.insert(ACCEPT_ENCODING, value);
        }
        _ => {
            headers.remove(ACCEPT_ENCODING);
        }
    }
}

/// Decode a complete upstream body.
pub fn decode(coding: ContentCoding, data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let err = |source| CodecError::Decode {
        coding: coding.as_str(),
        source,
    };

    let mut out = Vec::with_capacity(data.len());
    match coding {
        ContentCoding::Identity => out.extend_from_slice(data),
        ContentCoding::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out).map_err(err)?;
        }
        ContentCoding::Deflate => {
            DeflateDecoder::new(data).read_to_end(&mut out).map_err(err)?;
        }
        ContentCoding::Brotli => {
            brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE)
                .read_to_end(&mut out)
                .map_err(err)?;
        }
    }
    Ok(out)
}

/// Encode a complete body for the client.
pub fn encode(coding: ContentCoding, data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let err = |source| CodecError::Encode {
        coding: coding.as_str(),
        source,
    };

    match coding {
        ContentCoding::Identity => Ok(data.to_vec()),
        ContentCoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).map_err(err)?;
            encoder.finish().map_err(err)
        }
        ContentCoding::Deflate => {
            let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).map_err(err)?;
            encoder.finish().map_err(err)
        }
        ContentCoding::Brotli => {
            let params = BrotliEncoderParams {
                quality: BROTLI_QUALITY,
                ..Default::default()
            };
            let mut out = Vec::new();
            brotli::BrotliCompress(&mut Cursor::new(data), &mut out, &params).map_err(err)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_negotiate_preference() {
        assert_eq!(negotiate(&accept("br, gzip")), ContentCoding::Brotli);
        assert_eq!(negotiate(&accept("gzip, deflate, br")), ContentCoding::Brotli);
        assert_eq!(negotiate(&accept("gzip")), ContentCoding::Gzip);
        assert_eq!(negotiate(&accept("deflate")), ContentCoding::Identity);
        assert_eq!(negotiate(&HeaderMap::new()), ContentCoding::Identity);
    }

    #[test]
    fn test_negotiate_refused_coding() {
        assert_eq!(negotiate(&accept("br;q=0, gzip")), ContentCoding::Gzip);
        assert_eq!(negotiate(&accept("br;q=0.5")), ContentCoding::Brotli);
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(ContentCoding::from_headers(&headers), ContentCoding::Identity);
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("GZIP"));
        assert_eq!(ContentCoding::from_headers(&headers), ContentCoding::Gzip);
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("zstd"));
        assert_eq!(ContentCoding::from_headers(&headers), ContentCoding::Identity);
    }

    #[test]
    fn test_encode_then_decode_each_coding() {
        let body = "<html><head><title>t</title></head></html>".repeat(200);
        for coding in [
            ContentCoding::Identity,
            ContentCoding::Gzip,
            ContentCoding::Deflate,
            ContentCoding::Brotli,
        ] {
            let encoded = encode(coding, body.as_bytes()).unwrap();
            if coding != ContentCoding::Identity {
                assert!(encoded.len() < body.len(), "{} should compress", coding.as_str());
            }
            assert_eq!(decode(coding, &encoded).unwrap(), body.as_bytes());
        }
    }

    #[test]
    fn test_encode_empty_body() {
        let encoded = encode(ContentCoding::Brotli, b"").unwrap();
        assert!(decode(ContentCoding::Brotli, &encoded).unwrap().is_empty());
    }

    #[test]
    fn test_decode_corrupt_body_fails() {
        let result = decode(ContentCoding::Gzip, b"definitely not gzip");
        assert!(matches!(result, Err(CodecError::Decode { coding: "gzip", .. })));
    }

    #[test]
    fn test_restrict_accept_encoding() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br, zstd"));
        restrict_accept_encoding(&mut headers);
        assert_eq!(headers[ACCEPT_ENCODING], "gzip, deflate, br");

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("zstd;q=1.0, BR;q=0.5, *;q=0.1"));
        restrict_accept_encoding(&mut headers);
        assert_eq!(headers[ACCEPT_ENCODING], "BR;q=0.5");

        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("zstd"));
        restrict_accept_encoding(&mut headers);
        assert!(headers.get(ACCEPT_ENCODING).is_none());

        restrict_accept_encoding(&mut headers);
        assert!(headers.get(ACCEPT_ENCODING).is_none());
    }
}
