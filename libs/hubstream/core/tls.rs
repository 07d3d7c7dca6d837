//! Mutual-TLS transport
//!
//! The client presents its own certificate/key pair on every handshake.
//! Verification of the hub's certificate is controlled by
//! [`TlsSettings::verify_peer`] and is off by default: existing hubs run with
//! self-issued certificates and reachability is constrained by the
//! deployment network. Turn it on (and point `ca_path` at the hub's CA)
//! wherever that assumption does not hold.

use super::session::{connect_tcp, ResolvedAddress};
use crate::error::{HubError, Result};
use crate::traits::{BoxedStream, Connector};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default client certificate path
pub const DEFAULT_CERT_PATH: &str = "client.pem";

/// Default client private key path
pub const DEFAULT_KEY_PATH: &str = "client.key";

/// Client-side TLS material and policy
#[derive(Debug, Clone)]
pub struct TlsSettings {
    /// PEM certificate (chain) presented to the hub
    pub cert_path: PathBuf,
    /// PEM PKCS#8 private key matching `cert_path`
    pub key_path: PathBuf,
    /// Extra PEM root certificate trusted when verifying the hub
    pub ca_path: Option<PathBuf>,
    /// Verify the hub's certificate chain and hostname
    pub verify_peer: bool,
    /// Name sent for SNI/hostname checks (defaults to the host part of the address)
    pub domain: Option<String>,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from(DEFAULT_CERT_PATH),
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            ca_path: None,
            verify_peer: false,
            domain: None,
        }
    }
}

impl TlsSettings {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            ..Self::default()
        }
    }

    pub fn ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_path = Some(path.into());
        self
    }

    /// Verify the hub's certificate
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Load the certificate material and build a native-tls connector
    ///
    /// Missing or unparsable files are fatal misconfiguration.
    pub fn load(&self) -> Result<native_tls::TlsConnector> {
        let cert = read_pem(&self.cert_path)?;
        let key = read_pem(&self.key_path)?;
        let identity = native_tls::Identity::from_pkcs8(&cert, &key).map_err(|e| {
            HubError::Certificate(format!(
                "invalid key pair {} / {}: {}",
                self.cert_path.display(),
                self.key_path.display(),
                e
            ))
        })?;

        let mut builder = native_tls::TlsConnector::builder();
        builder.identity(identity);

        if let Some(ca_path) = &self.ca_path {
            let ca = read_pem(ca_path)?;
            let root = native_tls::Certificate::from_pem(&ca).map_err(|e| {
                HubError::Certificate(format!("invalid CA {}: {}", ca_path.display(), e))
            })?;
            builder.add_root_certificate(root);
        }

        if !self.verify_peer {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        builder
            .build()
            .map_err(|e| HubError::Tls(format!("failed to build TLS connector: {}", e)))
    }
}

fn read_pem(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| HubError::Certificate(format!("cannot read {}: {}", path.display(), e)))
}

/// Production [`Connector`]: TCP dial followed by a TLS handshake
pub struct TlsConnector {
    address: ResolvedAddress,
    domain: String,
    connector: tokio_native_tls::TlsConnector,
    connect_timeout: Option<Duration>,
}

impl TlsConnector {
    /// Load certificates and prepare a connector for an already resolved address
    pub fn new(
        address: ResolvedAddress,
        settings: &TlsSettings,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let connector = tokio_native_tls::TlsConnector::from(settings.load()?);
        let domain = settings
            .domain
            .clone()
            .unwrap_or_else(|| address.host().to_string());

        Ok(Self {
            address,
            domain,
            connector,
            connect_timeout,
        })
    }

    async fn handshake(&self) -> Result<BoxedStream> {
        let tcp = connect_tcp(&self.address).await?;
        let stream = self
            .connector
            .connect(&self.domain, tcp)
            .await
            .map_err(|e| HubError::Tls(format!("handshake with {} failed: {}", self.address, e)))?;
        debug!("TLS handshake with {} complete", self.address);
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self) -> Result<BoxedStream> {
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.handshake())
                .await
                .map_err(|_| {
                    HubError::Timeout(format!("connect to {} exceeded {:?}", self.address, limit))
                })?,
            None => self.handshake().await,
        }
    }

    fn address(&self) -> &str {
        self.address.as_str()
    }
}
