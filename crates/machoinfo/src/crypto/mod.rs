pub mod cms;
pub mod pem;

pub use cms::{CertificateChain, APPLE_SIGNER_INDEX};
