use crate::config::TlsConfig;
use anyhow::Context;
use tonic::transport::{Identity, ServerTlsConfig};

pub fn load_server_x509_credentials(tls_config: &TlsConfig) -> anyhow::Result<ServerTlsConfig> {
    let cert = std::fs::read(&tls_config.cert_path).with_context(|| {
        format!(
            "reading tls certificate from: {}",
            tls_config.cert_path.to_string_lossy()
        )
    })?;
    let key = std::fs::read(&tls_config.key_path).with_context(|| {
        format!(
            "reading tls key from: {}",
            tls_config.key_path.to_string_lossy()
        )
    })?;

    Ok(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
}
