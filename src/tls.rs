//! Loads the PEM certificate/key pair named by `TLS_CERT`/`TLS_KEY` for both
//! listener planes. TLS certificate loading is an external collaborator
//! (§1) — this just reads files and hands them to each plane's TLS config.

use tonic::transport::{Identity, ServerTlsConfig};

use crate::error::{ConfigError, ConfigResult};

pub struct TlsMaterial {
    pub cert_path: String,
    pub key_path: String,
}

impl TlsMaterial {
    pub fn load(cert_path: &str, key_path: &str) -> ConfigResult<Self> {
        read(cert_path, "certificate")?;
        read(key_path, "key")?;
        Ok(Self { cert_path: cert_path.to_string(), key_path: key_path.to_string() })
    }

    pub fn rpc_tls_config(&self) -> ConfigResult<ServerTlsConfig> {
        let cert = read(&self.cert_path, "certificate")?;
        let key = read(&self.key_path, "key")?;
        Ok(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
    }
}

fn read(path: &str, which: &'static str) -> ConfigResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Tls { which, path: path.to_string(), source })?;
    if bytes.is_empty() {
        return Err(ConfigError::TlsEmpty { which, path: path.to_string() });
    }
    Ok(bytes)
}
