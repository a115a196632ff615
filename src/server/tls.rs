// TLS module
// Loads PEM material and builds the acceptor used for HTTPS

use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::SupportedCipherSuite;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// AEAD suites with forward secrecy. TLS 1.3 suites come first; the TLS 1.2
/// entries are ECDHE with AES-GCM or ChaCha20-Poly1305 only.
pub fn strong_cipher_suites() -> Vec<SupportedCipherSuite> {
    use ring::cipher_suite::*;
    vec![
        TLS13_AES_256_GCM_SHA384,
        TLS13_AES_128_GCM_SHA256,
        TLS13_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ]
}

/// Build the acceptor from the configured certificate and key files
pub fn build_acceptor(config: &ServerConfig) -> Result<TlsAcceptor> {
    let (Some(cert_file), Some(key_file)) = (&config.tls_cert_file, &config.tls_key_file) else {
        return Err(Error::TlsMaterialMissing);
    };

    let certs = load_certs(cert_file)?;
    let key = load_key(key_file)?;
    let tls = server_config(certs, key, config.tls_strong_ciphers)?;
    Ok(TlsAcceptor::from(Arc::new(tls)))
}

/// TLS 1.2 minimum; the strong profile narrows the suite list
pub fn server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    strong_ciphers: bool,
) -> Result<rustls::ServerConfig> {
    let provider = if strong_ciphers {
        CryptoProvider {
            cipher_suites: strong_cipher_suites(),
            ..ring::default_provider()
        }
    } else {
        ring::default_provider()
    };

    let mut tls = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    tls.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(tls)
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<io::Result<Vec<_>>>()?;
    if certs.is_empty() {
        return Err(Error::TlsPem {
            kind: "certificate",
            path: path.display().to_string(),
        });
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| Error::TlsPem {
        kind: "private key",
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::CipherSuite;

    #[test]
    fn test_missing_material() {
        let config = ServerConfig {
            tls: true,
            ..ServerConfig::default()
        };
        assert!(matches!(build_acceptor(&config), Err(Error::TlsMaterialMissing)));

        let config = ServerConfig {
            tls: true,
            tls_cert_file: Some("/nonexistent/cert.pem".into()),
            ..ServerConfig::default()
        };
        assert!(matches!(build_acceptor(&config), Err(Error::TlsMaterialMissing)));
    }

    #[test]
    fn test_unreadable_and_empty_pem() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.pem");
        std::fs::write(&empty, "not a pem file\n").unwrap();

        let config = ServerConfig {
            tls: true,
            tls_cert_file: Some(dir.path().join("missing.pem")),
            tls_key_file: Some(empty.clone()),
            ..ServerConfig::default()
        };
        assert!(matches!(build_acceptor(&config), Err(Error::Io(_))));

        let config = ServerConfig {
            tls: true,
            tls_cert_file: Some(empty.clone()),
            tls_key_file: Some(empty),
            ..ServerConfig::default()
        };
        match build_acceptor(&config) {
            Err(Error::TlsPem { kind, .. }) => assert_eq!(kind, "certificate"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_strong_suites_are_forward_secret_aead() {
        let suites = strong_cipher_suites();
        assert_eq!(suites.len(), 9);
        for suite in suites {
            let name = format!("{:?}", suite.suite());
            assert!(
                name.starts_with("TLS13_") || name.starts_with("TLS_ECDHE_"),
                "{name}"
            );
            assert!(!name.contains("CBC"), "{name}");
        }
        assert!(strong_cipher_suites()
            .iter()
            .any(|s| s.suite() == CipherSuite::TLS13_AES_128_GCM_SHA256));
    }
}
