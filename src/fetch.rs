use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use log::debug;
use rustls::{OwnedTrustAnchor, RootCertStore};
use webpki_roots::TLS_SERVER_ROOTS;

use crate::error::{Error, Result};

#[async_trait]
pub trait Fetch: Send + Sync {
    /// GETs `url` and returns the body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    timeout: Duration,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_redirects: usize) -> Self {
        let mut root_cert_store = RootCertStore::empty();
        root_cert_store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));

        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https = HttpsConnectorBuilder::new()
            .with_tls_config(config)
            .https_or_http()
            .enable_http1()
            .build();

        Self {
            client: Client::builder().build(https),
            timeout,
            max_redirects,
        }
    }

    async fn get(&self, url: &str) -> Result<Bytes> {
        let mut current = url.to_string();
        for _ in 0..=self.max_redirects {
            let uri: Uri = current
                .parse()
                .map_err(|e| Error::Http(format!("invalid url {}: {}", current, e)))?;
            let response = self
                .client
                .get(uri)
                .await
                .map_err(|e| Error::Http(e.to_string()))?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(hyper::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::Http(format!("{} without Location", status)))?;
                current = resolve_redirect(&current, location)?;
                debug!("[Fetch] redirected to {}", current);
                continue;
            }
            if !status.is_success() {
                return Err(Error::Http(format!("{} returned {}", current, status)));
            }
            return hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| Error::Http(e.to_string()));
        }
        Err(Error::Http(format!("too many redirects for {}", url)))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let body = tokio::time::timeout(self.timeout, self.get(url))
            .await
            .map_err(|_| Error::Http(format!("timed out after {:?}", self.timeout)))??;
        debug!("[Fetch] {} bytes from {}", body.len(), url);
        String::from_utf8(body.to_vec()).map_err(|e| Error::Http(format!("body is not UTF-8: {}", e)))
    }
}

fn resolve_redirect(base: &str, location: &str) -> Result<String> {
    let base = url::Url::parse(base).map_err(|e| Error::Http(e.to_string()))?;
    base.join(location)
        .map(String::from)
        .map_err(|e| Error::Http(format!("bad redirect {}: {}", location, e)))
}
