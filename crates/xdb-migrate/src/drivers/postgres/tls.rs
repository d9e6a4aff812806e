//! TLS setup for PostgreSQL sessions.

use rustls::ClientConfig;
use serde::{Deserialize, Serialize};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

/// SSL modes accepted for PostgreSQL connections.
///
/// Certificates are always verified against the webpki roots when TLS is
/// on; `verify-ca` behaves like `verify-full` because rustls checks the
/// host name as part of verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// Plain TCP.
    #[default]
    Disable,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    /// Connector for deadpool-postgres, `None` when TLS is disabled.
    pub fn connector(&self) -> Option<MakeRustlsConnect> {
        match self {
            SslMode::Disable => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            SslMode::VerifyCa | SslMode::VerifyFull => {
                info!("TLS enabled with certificate and hostname verification");
                let mut roots = rustls::RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                let config = ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth();
                Some(MakeRustlsConnect::new(config))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_serde_names() {
        let mode: SslMode = serde_yaml::from_str("verify-full").unwrap();
        assert_eq!(mode, SslMode::VerifyFull);
        let mode: SslMode = serde_yaml::from_str("disable").unwrap();
        assert!(!mode.requires_tls());
        assert!(serde_yaml::from_str::<SslMode>("sometimes").is_err());
    }

    #[test]
    fn test_disable_has_no_connector() {
        assert!(SslMode::Disable.connector().is_none());
    }
}
