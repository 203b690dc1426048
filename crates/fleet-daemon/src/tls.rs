//! Mutual TLS for the control surface
//!
//! Callers must present a certificate signed by the configured CA. The
//! daemon identifies itself with the same certificate and key it uses
//! towards the backend.

use crate::config::{expand_home, TlsConfig};
use crate::error::{DaemonError, DaemonResult};
use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use std::path::Path;
use std::sync::Arc;

/// Build the listener's rustls configuration
///
/// Every failure is reported as [`DaemonError::Tls`] naming the offending file.
pub fn server_config(tls: &TlsConfig) -> DaemonResult<RustlsConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let chain = load_certs(&tls.cert)?;
    let key = load_key(&tls.key)?;
    let verifier = client_verifier(&tls.ca_cert, provider.clone())?;

    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| DaemonError::Tls(e.to_string()))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)
        .map_err(|e| {
            DaemonError::Tls(format!(
                "{} does not match {}: {}",
                tls.cert.display(),
                tls.key.display(),
                e
            ))
        })?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

fn client_verifier(
    ca_cert: &Path,
    provider: Arc<CryptoProvider>,
) -> DaemonResult<Arc<dyn rustls::server::danger::ClientCertVerifier>> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(ca_cert)? {
        roots
            .add(cert)
            .map_err(|e| tls_error(ca_cert, e))?;
    }

    WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
        .build()
        .map_err(|e| tls_error(ca_cert, e))
}

fn load_certs(path: &Path) -> DaemonResult<Vec<CertificateDer<'static>>> {
    let path = expand_home(path);
    let certs = CertificateDer::pem_file_iter(&path)
        .map_err(|e| tls_error(&path, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(&path, e))?;

    if certs.is_empty() {
        return Err(tls_error(&path, "no certificates found"));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> DaemonResult<PrivateKeyDer<'static>> {
    let path = expand_home(path);
    PrivateKeyDer::from_pem_file(&path).map_err(|e| tls_error(&path, e))
}

fn tls_error(path: &Path, err: impl std::fmt::Display) -> DaemonError {
    DaemonError::Tls(format!("{}: {}", path.display(), err))
}
