//! PostgreSQL connection pooling with TLS support.
//!
//! Both ends of a copy are PostgreSQL, so one builder serves the source and
//! the target. Pools are lazy: no connection is opened until first use, which
//! keeps `health-check` able to report per-side failures.

use std::sync::Arc;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::error::{CopyError, Result};

// One connection for the sequential fetch/insert loop, one spare for
// metadata and count queries.
const POOL_SIZE: usize = 2;

/// Build a connection pool for one end of the copy.
pub(crate) fn build_pool(config: &DbConfig, context: &str) -> Result<Pool> {
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host);
    pg_config.port(config.port);
    pg_config.dbname(&config.dbname);
    pg_config.user(&config.user);
    pg_config.password(&config.password);

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let pool = match config.ssl_mode.to_lowercase().as_str() {
        "disable" => {
            warn!(
                "TLS is disabled for the {} database. Credentials will be transmitted in plaintext.",
                context
            );
            let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
            Pool::builder(mgr)
                .max_size(POOL_SIZE)
                .build()
                .map_err(|e| CopyError::pool(e, format!("creating {} pool", context)))?
        }
        mode => {
            let tls_connector = MakeRustlsConnect::new(build_tls_config(mode)?);
            let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
            Pool::builder(mgr)
                .max_size(POOL_SIZE)
                .build()
                .map_err(|e| CopyError::pool(e, format!("creating {} pool", context)))?
        }
    };

    info!(
        "Configured {} pool for {}:{}/{}",
        context, config.host, config.port, config.dbname
    );

    Ok(pool)
}

/// Build TLS configuration based on ssl_mode.
fn build_tls_config(ssl_mode: &str) -> Result<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = match ssl_mode {
        "require" => {
            debug!("ssl_mode=require: TLS enabled but server certificate is not verified");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
                .with_no_client_auth()
        }
        "verify-ca" | "verify-full" => {
            debug!("ssl_mode={}: certificate verification enabled", ssl_mode);
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        other => {
            return Err(CopyError::Config(format!(
                "Invalid ssl_mode '{}'. Valid options: disable, require, verify-ca, verify-full",
                other
            )));
        }
    };

    Ok(config)
}

/// Certificate verifier that accepts any certificate, used for
/// `ssl_mode=require` where TLS is wanted without CA validation
/// (self-signed certs, pooled cloud endpoints).
#[derive(Debug)]
struct AcceptAllVerifier;

impl rustls::client::danger::ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
