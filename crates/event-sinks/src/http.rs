// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use reqwest::ClientBuilder;
use std::error::Error;
use std::io;
use tracing::error;
#[cfg(feature = "fips")]
use tracing::debug;

/// Builds the client used for log pushes with the given per-request timeout.
///
/// Falls back to a default client if the TLS setup fails so that the metric
/// sink keeps working; pushes may then fail and are logged like any other
/// transport error.
#[must_use]
pub fn get_client(timeout: Duration) -> reqwest::Client {
    match build_client(timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to build HTTP client for log pushes, using defaults: {e}");
            reqwest::Client::new()
        }
    }
}

/// Installs the AWS-LC FIPS provider as the process-wide rustls default.
///
/// Must run before any client is built; reqwest has no provider of its own in
/// this build.
#[cfg(feature = "fips")]
pub fn prepare_client_provider() -> io::Result<()> {
    rustls::crypto::default_fips_provider()
        .install_default()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to set up fips provider: {e:?}"),
            )
        })
}

/// No-op: reqwest brings its own rustls provider.
#[cfg(not(feature = "fips"))]
pub fn prepare_client_provider() -> io::Result<()> {
    Ok(())
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, Box<dyn Error>> {
    Ok(create_reqwest_client_builder()?.timeout(timeout).build()?)
}

#[cfg(not(feature = "fips"))]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    Ok(reqwest::Client::builder().use_rustls_tls())
}

/// FIPS variant: requires a FIPS crypto provider to have been installed as
/// the process default and trusts the native root store.
#[cfg(feature = "fips")]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    let provider =
        rustls::crypto::CryptoProvider::get_default().ok_or("No crypto provider configured")?;

    if !provider.fips() {
        return Err("Crypto provider is not FIPS-compliant".into());
    }

    let mut root_cert_store = rustls::RootCertStore::empty();
    let native_certs = rustls_native_certs::load_native_certs();
    let mut valid_count = 0;
    for cert in native_certs.certs {
        match root_cert_store.add(cert) {
            Ok(()) => valid_count += 1,
            Err(err) => {
                debug!("Failed to parse certificate: {:?}", err);
            }
        }
    }
    if valid_count == 0 {
        return Err("No valid certificates found in native root store".into());
    }

    let config = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(rustls::ALL_VERSIONS)
        .map_err(|_| "Failed to set protocol versions")?
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    if !config.fips() {
        return Err("The final TLS configuration is not FIPS-compliant".into());
    }
    debug!("Log push client is configured with FIPS.");

    Ok(reqwest::Client::builder().use_preconfigured_tls(config))
}
