//! Builds a [`TlsAcceptor`] from the certificate/key paths in [`TlsConfig`],
//! including optional mutual-TLS client certificate verification.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

use super::TlsConfig;

/// Everything that can go wrong building a [`ServerConfig`] from PEM files
/// on disk.
#[derive(Debug)]
pub enum TlsError {
    Io(std::io::Error),
    CertificateError(String),
    PrivateKeyError(String),
    ConfigError(String),
}

impl std::fmt::Display for TlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsError::Io(err) => write!(f, "i/o error reading TLS material: {}", err),
            TlsError::CertificateError(msg) => write!(f, "certificate error: {}", msg),
            TlsError::PrivateKeyError(msg) => write!(f, "private key error: {}", msg),
            TlsError::ConfigError(msg) => write!(f, "tls configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TlsError {}

impl From<std::io::Error> for TlsError {
    fn from(err: std::io::Error) -> Self {
        TlsError::Io(err)
    }
}

fn read_cert_chain(path: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let reader = BufReader::new(File::open(path)?);
    let chain: Vec<_> = CertificateDer::pem_reader_iter(reader)
        .collect::<Result<_, _>>()
        .map_err(|e| TlsError::CertificateError(format!("parsing {}: {}", path, e)))?;

    if chain.is_empty() {
        return Err(TlsError::CertificateError(format!(
            "{} contains no certificates",
            path
        )));
    }

    Ok(chain)
}

fn read_private_key(path: &str) -> Result<PrivateKeyDer<'static>, TlsError> {
    let reader = BufReader::new(File::open(path)?);
    PrivateKeyDer::from_pem_reader(reader)
        .map_err(|e| TlsError::PrivateKeyError(format!("parsing {}: {}", path, e)))
}

fn build_root_store(ca_path: &str) -> Result<RootCertStore, TlsError> {
    let mut store = RootCertStore::empty();
    for cert in read_cert_chain(ca_path)? {
        store
            .add(cert)
            .map_err(|e| TlsError::CertificateError(format!("adding CA cert: {}", e)))?;
    }
    Ok(store)
}

/// Which client-certificate policy to apply, derived from [`TlsConfig`].
enum ClientAuthPolicy<'a> {
    /// No `ca_cert_path` configured: accept connections without client certs.
    Disabled,
    /// `ca_cert_path` set, `require_client_cert` false: verify a client cert
    /// if one is presented, otherwise allow the connection anyway.
    Optional(&'a str),
    /// `require_client_cert` true: reject the handshake unless the client
    /// presents a certificate signed by the configured CA.
    Required(&'a str),
}

impl<'a> ClientAuthPolicy<'a> {
    fn from_config(config: &'a TlsConfig) -> Result<Self, TlsError> {
        match (config.require_client_cert, config.ca_cert_path.as_deref()) {
            (true, Some(ca)) => Ok(Self::Required(ca)),
            (true, None) => Err(TlsError::ConfigError(
                "ca_cert_path is required when require_client_cert is true".into(),
            )),
            (false, Some(ca)) => Ok(Self::Optional(ca)),
            (false, None) => Ok(Self::Disabled),
        }
    }
}

/// Loads the certificate chain and key named by `config` and builds a
/// [`TlsAcceptor`] ready to wrap accepted TCP sockets.
pub fn load_tls_config(config: &TlsConfig) -> Result<TlsAcceptor, TlsError> {
    let certs = read_cert_chain(&config.cert_path)?;
    let key = read_private_key(&config.key_path)?;
    let policy = ClientAuthPolicy::from_config(config)?;

    let builder = ServerConfig::builder();
    let server_config = match policy {
        ClientAuthPolicy::Disabled => builder
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TlsError::ConfigError(format!("building server config: {}", e)))?,
        ClientAuthPolicy::Optional(ca) => {
            let verifier = WebPkiClientVerifier::builder(Arc::new(build_root_store(ca)?))
                .allow_unauthenticated()
                .build()
                .map_err(|e| TlsError::ConfigError(format!("building client verifier: {}", e)))?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs, key)
                .map_err(|e| TlsError::ConfigError(format!("building server config: {}", e)))?
        }
        ClientAuthPolicy::Required(ca) => {
            let verifier = WebPkiClientVerifier::builder(Arc::new(build_root_store(ca)?))
                .build()
                .map_err(|e| TlsError::ConfigError(format!("building client verifier: {}", e)))?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs, key)
                .map_err(|e| TlsError::ConfigError(format!("building server config: {}", e)))?
        }
    };

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}
