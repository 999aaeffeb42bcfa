/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::{convert::TryFrom, io, sync::Arc};

use rustls::{
    client::{
        danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        verify_server_cert_signed_by_trust_anchor, verify_server_name, WebPkiServerVerifier,
    },
    crypto::CryptoProvider,
    server::ParsedCertificate,
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use rustls_pki_types::{CertificateDer, ServerName, TrustAnchor, UnixTime};
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

use super::Error;

/// Performs the client side TLS handshake over `stream`.
pub async fn into_tls(
    tls_connector: &TlsConnector,
    hostname: &str,
    stream: TcpStream,
) -> super::Result<TlsStream<TcpStream>> {
    tls_connector
        .connect(
            ServerName::try_from(hostname)
                .map_err(|_| Error::InvalidTLSName)?
                .to_owned(),
            stream,
        )
        .await
        .map_err(|err| {
            let kind = err.kind();
            if let Some(inner) = err.into_inner() {
                match inner.downcast::<rustls::Error>() {
                    Ok(error) => Error::Tls(*error),
                    Err(error) => Error::Io(io::Error::new(kind, error)),
                }
            } else {
                Error::Io(io::Error::new(kind, "Unspecified"))
            }
        })
}

fn root_cert_store() -> RootCertStore {
    let mut root_cert_store = RootCertStore::empty();

    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| TrustAnchor {
        subject: ta.subject.clone(),
        subject_public_key_info: ta.subject_public_key_info.clone(),
        name_constraints: ta.name_constraints.clone(),
    }));

    root_cert_store
}

/// Builds a connector trusting the Mozilla root store. With
/// `ignore_self_signed`, a certificate signed by its own key and valid for
/// the server name is accepted as well.
pub fn build_tls_connector(ignore_self_signed: bool) -> super::Result<TlsConnector> {
    let config = if !ignore_self_signed {
        ClientConfig::builder()
            .with_root_certificates(root_cert_store())
            .with_no_client_auth()
    } else {
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SelfSignedVerifier::new()?))
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

#[doc(hidden)]
#[derive(Debug)]
struct SelfSignedVerifier {
    inner: Arc<WebPkiServerVerifier>,
    provider: Arc<CryptoProvider>,
}

impl SelfSignedVerifier {
    fn new() -> super::Result<Self> {
        let inner = WebPkiServerVerifier::builder(Arc::new(root_cert_store()))
            .build()
            .map_err(|err| Error::Tls(rustls::Error::General(err.to_string())))?;
        // Building the verifier installs the default provider
        let provider = CryptoProvider::get_default().cloned().ok_or_else(|| {
            Error::Tls(rustls::Error::General(
                "No crypto provider installed".to_string(),
            ))
        })?;

        Ok(SelfSignedVerifier { inner, provider })
    }

    /// Accepts `end_entity` only if it is its own issuer and names
    /// `server_name`.
    fn verify_self_signed(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;
        let mut roots = RootCertStore::empty();
        roots.add(end_entity.clone())?;

        verify_server_cert_signed_by_trust_anchor(
            &cert,
            &roots,
            &[],
            now,
            self.provider.signature_verification_algorithms.all,
        )
        .map_err(|_| rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer))?;
        verify_server_name(&cert, server_name)?;

        log::debug!("Accepting self-signed certificate for {:?}", server_name);
        Ok(ServerCertVerified::assertion())
    }
}

impl ServerCertVerifier for SelfSignedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer)) => {
                self.verify_self_signed(end_entity, server_name, now)
            }
            result => result,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod test {
    use rustls::{client::danger::ServerCertVerifier, CertificateError};
    use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

    use super::{build_tls_connector, SelfSignedVerifier};

    const SELF_SIGNED: &[u8] = include_bytes!("../../resources/certs/self_signed_localhost.der");
    const PRIVATE_CA: &[u8] = include_bytes!("../../resources/certs/private_ca_localhost.der");

    #[test]
    fn connectors() {
        assert!(build_tls_connector(false).is_ok());
        assert!(build_tls_connector(true).is_ok());
    }

    #[test]
    fn self_signed_certificates() {
        let verifier = SelfSignedVerifier::new().unwrap();
        let verify = |der: &'static [u8], name: &'static str| {
            verifier.verify_server_cert(
                &CertificateDer::from(der),
                &[],
                &ServerName::try_from(name).unwrap(),
                &[],
                UnixTime::now(),
            )
        };

        assert!(verify(SELF_SIGNED, "localhost").is_ok());

        // Wrong host name
        assert!(matches!(
            verify(SELF_SIGNED, "mail.example.com"),
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
            ))
        ));

        // Issued by a CA nobody trusts
        assert!(matches!(
            verify(PRIVATE_CA, "localhost"),
            Err(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer
            ))
        ));
    }
}
