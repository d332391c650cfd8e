//! Cache-hit fast path.
//!
//! A fresh conditional request is answered with 304 before the file is
//! read. Otherwise the cached bytes are encoded for the client's
//! Accept-Encoding and sent with validator and identity headers.

use axum::body::Body;
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, SERVER, VARY};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;

use crate::cache::{CacheKey, CacheStore, CachedFile};
use crate::codec;
use crate::http::conditional::{Freshness, Validator};
use crate::http::proxy::ProxyError;
use crate::http::response::SERVER_NAME;

/// Answer a request from the cache file found for `key`.
pub async fn serve(
    store: &CacheStore,
    key: &CacheKey,
    file: &CachedFile,
    request_headers: &HeaderMap,
) -> Result<Response, ProxyError> {
    let validator = Validator::new(file.modified, file.len);
    if validator.evaluate(request_headers) == Freshness::Fresh {
        let mut response = validator.not_modified();
        response
            .headers_mut()
            .insert(SERVER, HeaderValue::from_static(SERVER_NAME));
        return Ok(response);
    }

    let data = store.read(key).await?;
    let coding = codec::negotiate(request_headers);
    let body = tokio::task::spawn_blocking(move || codec::encode(coding, &data)).await??;

    let len = HeaderValue::from(body.len());
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    if let Some(mime) = mime_guess::from_path(&file.path).first_raw() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    }
    if let Some(encoding) = coding.header_value() {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    headers.insert(CONTENT_LENGTH, len);
    headers.insert(VARY, HeaderValue::from_static("accept-encoding"));
    headers.insert(SERVER, HeaderValue::from_static(SERVER_NAME));
    validator.write_headers(headers);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ContentCoding;
    use crate::routing::SiteClass;
    use axum::body::to_bytes;
    use axum::http::header::{ACCEPT_ENCODING, ETAG, IF_NONE_MATCH};
    use axum::http::StatusCode;
    use bytes::Bytes;

    const PAGE: &[u8] = b"<html><head><title>cached</title></head><body>hello hello hello</body></html>";

    async fn filled_store() -> (tempfile::TempDir, CacheStore, CacheKey, CachedFile) {
        let root = tempfile::tempdir().unwrap();
        let store = CacheStore::new(root.path());
        let key = CacheKey::for_request(SiteClass::Main, "/", true).unwrap();
        store.write(&key, Bytes::from_static(PAGE)).await.unwrap();
        let file = store.lookup(&key).await.unwrap();
        (root, store, key, file)
    }

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(value));
        headers
    }

    #[tokio::test]
    async fn test_identity_hit() {
        let (_root, store, key, file) = filled_store().await;
        let response = serve(&store, &key, &file, &HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()[SERVER], SERVER_NAME);
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], PAGE);
    }

    #[tokio::test]
    async fn test_negotiated_hit() {
        let (_root, store, key, file) = filled_store().await;

        let response = serve(&store, &key, &file, &accept("br, gzip")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_ENCODING], "br");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(codec::decode(ContentCoding::Brotli, &body).unwrap(), PAGE);

        let response = serve(&store, &key, &file, &accept("gzip")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(codec::decode(ContentCoding::Gzip, &body).unwrap(), PAGE);
    }

    #[tokio::test]
    async fn test_fresh_validator_skips_body() {
        let (_root, store, key, file) = filled_store().await;
        let first = serve(&store, &key, &file, &HeaderMap::new()).await.unwrap();
        let etag = first.headers()[ETAG].clone();

        let mut headers = accept("br");
        headers.insert(IF_NONE_MATCH, etag);
        let response = serve(&store, &key, &file, &headers).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_vanished_file_is_an_error() {
        let (_root, store, key, file) = filled_store().await;
        std::fs::remove_file(&file.path).unwrap();
        let result = serve(&store, &key, &file, &HeaderMap::new()).await;
        assert!(matches!(result, Err(ProxyError::Cache(_))));
    }
}
