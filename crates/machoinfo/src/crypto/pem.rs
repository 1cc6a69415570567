//! PEM armor for DER payloads.

use pem::{EncodeConfig, LineEnding, Pem};

use crate::{Error, Result};

/// PEM label used for CMS signatures.
pub const PKCS7_LABEL: &str = "PKCS7";

/// Armor CMS DER bytes as a `PKCS7` PEM document.
pub fn armor_pkcs7(der: &[u8]) -> String {
    armor(PKCS7_LABEL, der)
}

/// Armor DER bytes with the given PEM label, 64 base64 columns per LF-terminated line.
pub fn armor(label: &str, der: &[u8]) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    pem::encode_config(&Pem::new(label, der.to_vec()), config)
}

/// Parse a PEM document and return its body if the label is `label`.
pub fn dearmor(input: &str, label: &str) -> Result<Vec<u8>> {
    let doc = pem::parse(input).map_err(|e| Error::Cms(format!("invalid PEM: {e}")))?;
    if doc.tag() != label {
        return Err(Error::Cms(format!(
            "expected a {label} PEM document, found {}",
            doc.tag()
        )));
    }
    Ok(doc.into_contents())
}
