pub mod builder;
pub mod codesign;
pub mod crypto;
pub mod entitlements;
pub mod error;
pub mod macho;
pub mod plist;
pub mod reader;

pub use builder::Inspector;
pub use crypto::CertificateChain;
pub use entitlements::readable_entitlements;
pub use error::Error;
pub use macho::{executable_name, MachoInfo};
pub use plist::{BplistDecoder, BplistValue, Plist};

pub type Result<T> = std::result::Result<T, Error>;
