//! Certificate chain extraction from the CMS signature blob
//!
//! The CMS blob is re-armored as PEM and handed to
//! `cryptographic-message-syntax`, which decodes the `SignedData` structure.
//! No signature or trust validation happens here.

use cryptographic_message_syntax::SignedData;
use x509_certificate::CapturedX509Certificate;

use super::pem::{armor_pkcs7, dearmor, PKCS7_LABEL};
use crate::{Error, Result};

/// Chain position of the signing certificate in Apple-issued signatures.
///
/// Apple's codesign embeds the chain root-first (Apple Root CA, WWDR
/// intermediate, developer certificate), so the developer certificate sits at
/// index 2. This is a property of Apple's tooling, not of CMS.
pub const APPLE_SIGNER_INDEX: usize = 2;

/// Certificates embedded in a CMS `SignedData`, in encoded order.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certificates: Vec<CapturedX509Certificate>,
}

impl CertificateChain {
    /// Decode a `PKCS7` PEM document.
    pub fn from_pkcs7_pem(pem: &str) -> Result<Self> {
        let der = dearmor(pem, PKCS7_LABEL)?;
        let signed_data = SignedData::parse_ber(&der)
            .map_err(|e| Error::Cms(format!("Failed to parse SignedData: {e}")))?;

        Ok(Self {
            certificates: signed_data.certificates().cloned().collect(),
        })
    }

    /// Armor raw CMS DER bytes and decode them.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_pkcs7_pem(&armor_pkcs7(der))
    }

    pub fn certificates(&self) -> &[CapturedX509Certificate] {
        &self.certificates
    }

    pub fn into_certificates(self) -> Vec<CapturedX509Certificate> {
        self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Certificate at `index`, the signer by convention.
    pub fn signer(&self, index: usize) -> Option<&CapturedX509Certificate> {
        self.certificates.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_der_is_an_error() {
        assert!(matches!(
            CertificateChain::from_der(&[0x30, 0x03, 0x01, 0x02, 0x03]),
            Err(Error::Cms(_))
        ));
    }

    #[test]
    fn test_bad_armor_is_an_error() {
        assert!(matches!(
            CertificateChain::from_pkcs7_pem("not pem"),
            Err(Error::Cms(_))
        ));
    }
}
