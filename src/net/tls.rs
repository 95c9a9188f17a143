//! TLS configuration and certificate loading for the listener.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;

/// Build a TLS acceptor from the PEM files named in the config.
pub fn load_tls_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, std::io::Error> {
    let certs = load_certs(Path::new(&config.cert_path))?;
    let key = load_private_key(Path::new(&config.key_path))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let server_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(invalid_data)?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(invalid_data)?;

    tracing::info!(cert_path = %config.cert_path, "TLS enabled on listener");
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, std::io::Error> {
    let mut reader = BufReader::new(open(path, "Certificate")?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("No certificates found in {:?}", path),
        ));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, std::io::Error> {
    let mut reader = BufReader::new(open(path, "Private key")?);
    rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("No private key found in {:?}", path),
        )
    })
}

fn open(path: &Path, what: &str) -> Result<File, std::io::Error> {
    File::open(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("{} file {:?}: {}", what, path, e))
    })
}

fn invalid_data(e: rustls::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}
