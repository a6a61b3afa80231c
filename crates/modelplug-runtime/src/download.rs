// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, SSRF-safe download of remote bundles.
//!
//! Hostnames are resolved through [`PublicOnlyResolver`], which drops
//! private, loopback and link-local addresses before a connection is made.
//! Literal addresses never reach the resolver, so they are checked on the
//! initial URL and again on every redirect hop. `install.allow_private_hosts`
//! turns both filters off.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use modelplug_config::model::InstallConfig;
use modelplug_core::{InstallError, RuntimeError};
use reqwest::Url;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

/// Redirect hops followed before a download is abandoned.
const MAX_REDIRECTS: usize = 10;

/// DNS resolver that refuses private and reserved addresses.
#[derive(Debug, Default)]
pub struct PublicOnlyResolver;

impl PublicOnlyResolver {
    /// RFC 1918, loopback, link-local, broadcast, unspecified, the cloud
    /// metadata endpoint, and IPv6 unique-local/link-local ranges.
    pub fn is_private(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => {
                v4.is_private()
                    || v4.is_loopback()
                    || v4.is_link_local()
                    || v4.is_broadcast()
                    || v4.is_unspecified()
                    || *v4 == Ipv4Addr::new(169, 254, 169, 254)
            }
            IpAddr::V6(v6) => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    || (v6.segments()[0] & 0xfe00) == 0xfc00
                    || (v6.segments()[0] & 0xffc0) == 0xfe80
                    || v6.to_ipv4_mapped().is_some_and(|v4| Self::is_private(&IpAddr::V4(v4)))
            }
        }
    }
}

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let hostname = name.as_str().to_string();
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host(format!("{hostname}:0"))
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
                .filter(|addr| {
                    let blocked = PublicOnlyResolver::is_private(&addr.ip());
                    if blocked {
                        error!(ip = %addr.ip(), host = %hostname, "blocked bundle host resolving to private address");
                    }
                    !blocked
                })
                .collect();
            if addrs.is_empty() {
                let err: Box<dyn std::error::Error + Send + Sync> =
                    format!("{hostname} resolves only to private addresses").into();
                return Err(err);
            }
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

/// A fetched bundle.
#[derive(Debug)]
pub struct Downloaded {
    pub bytes: Vec<u8>,
    /// File name taken from the last URL path segment.
    pub filename: String,
    pub sha256: String,
}

/// HTTP client for URL installs.
#[derive(Debug, Clone)]
pub struct BundleDownloader {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
    allow_private_hosts: bool,
}

impl BundleDownloader {
    pub fn new(config: &InstallConfig) -> Result<Self, RuntimeError> {
        let client = client_builder(config).build().map_err(|e| {
            error!("failed to build download client: {e}");
            RuntimeError::Internal(format!("failed to build download client: {e}"))
        })?;
        Ok(Self::with_client(config, client))
    }

    fn with_client(config: &InstallConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.download_timeout_secs),
            max_bytes: config.max_bundle_bytes,
            allow_private_hosts: config.allow_private_hosts,
        }
    }

    /// Fetch `url`, enforcing the size limit and an optional SHA-256 pin.
    pub async fn fetch(&self, url: &str, expected_sha256: Option<&str>) -> Result<Downloaded, RuntimeError> {
        let parsed = self.check_url(url)?;
        let download_err = |message: String| InstallError::Download {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("server answered {status}")).into());
        }
        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            return Err(InstallError::TooLarge {
                limit: self.max_bytes,
            }
            .into());
        }

        let mut bytes = Vec::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(url, e))?;
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(InstallError::TooLarge {
                    limit: self.max_bytes,
                }
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }

        let digest = hex::encode(Sha256::digest(&bytes));
        if let Some(expected) = expected_sha256
            && !expected.eq_ignore_ascii_case(&digest)
        {
            return Err(InstallError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: digest,
            }
            .into());
        }

        let filename = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("bundle.zip")
            .to_string();
        info!(url, bytes = bytes.len(), sha256 = %digest, "downloaded bundle");
        Ok(Downloaded {
            bytes,
            filename,
            sha256: digest,
        })
    }

    fn check_url(&self, url: &str) -> Result<Url, RuntimeError> {
        let unsupported = |reason: &str| -> RuntimeError {
            InstallError::UnsupportedSource {
                reference: format!("{url}: {reason}"),
            }
            .into()
        };
        let parsed = Url::parse(url).map_err(|e| unsupported(&e.to_string()))?;
        if let Some(reason) = rejection(&parsed, self.allow_private_hosts) {
            error!(url, reason, "blocked bundle URL");
            return Err(unsupported(reason));
        }
        debug!(url, "bundle URL accepted");
        Ok(parsed)
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> RuntimeError {
        if e.is_timeout() {
            InstallError::Timeout {
                step: format!("download of {url}"),
                duration: self.timeout,
            }
            .into()
        } else {
            InstallError::Download {
                url: url.to_string(),
                message: e.to_string(),
            }
            .into()
        }
    }
}

fn client_builder(config: &InstallConfig) -> reqwest::ClientBuilder {
    let allow_private_hosts = config.allow_private_hosts;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match rejection(attempt.url(), allow_private_hosts) {
            Some(reason) => {
                let message = format!("redirect to {} refused: {reason}", attempt.url());
                warn!(target_url = %attempt.url(), reason, "refused bundle redirect");
                attempt.error(message)
            }
            None => attempt.follow(),
        }
    });

    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .redirect(policy)
        .user_agent(concat!("modelplug/", env!("CARGO_PKG_VERSION")));
    if !allow_private_hosts {
        builder = builder.dns_resolver(Arc::new(PublicOnlyResolver));
    }
    builder
}

/// Why a download target is refused, if it is.
fn rejection(url: &Url, allow_private_hosts: bool) -> Option<&'static str> {
    if !matches!(url.scheme(), "http" | "https") {
        return Some("only http and https are supported");
    }
    let literal = url
        .host_str()?
        .trim_matches(['[', ']'])
        .parse::<IpAddr>()
        .ok()?;
    (!allow_private_hosts && PublicOnlyResolver::is_private(&literal))
        .then_some("private addresses are not allowed")
}
