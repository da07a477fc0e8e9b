//! TLS client context for `wss://` signaling endpoints.

use std::sync::Arc;

use rustls::version::{TLS12, TLS13};
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};

use crate::error::{Result, SignalingError};

/// Protocol versions offered to the server, newest first
pub static PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] = &[&TLS13, &TLS12];

/// Build the client TLS context used for every connection.
///
/// Only TLS 1.2 and 1.3 are offered. rustls has no SSLv2/SSLv3 or static
/// DH support at all, so those never need to be switched off explicitly.
pub fn client_config() -> Result<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)
        .map_err(|e| SignalingError::TransportInit(format!("TLS context: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}
