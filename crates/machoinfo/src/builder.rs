//! Inspector builder API
//!
//! Provides a builder pattern interface for inspecting app executables and
//! their Info.plist files.

use std::path::Path;

use tracing::{debug, warn};

use crate::codesign::EmbeddedSignature;
use crate::crypto::{CertificateChain, APPLE_SIGNER_INDEX};
use crate::macho::info::{self, icon_name, MachoInfo};
use crate::macho::{first_fat_slice, is_fat, MachOFile};
use crate::plist::{decode_plist, DecodeLimits, Plist};
use crate::{Error, Result};

/// Signature and Info.plist inspector with builder pattern API.
///
/// # Example
///
/// ```no_run
/// use machoinfo::Inspector;
///
/// let info = Inspector::new()
///     .max_depth(64)
///     .inspect_app_files("Payload/Demo.app/Info.plist", "Payload/Demo.app/Demo")?;
/// println!("{:?} {:?}", info.common_name, info.capabilities());
/// # Ok::<(), machoinfo::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Inspector {
    limits: DecodeLimits,
    signer_index: usize,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    /// Create a new Inspector with the default limits.
    pub fn new() -> Self {
        Self {
            limits: DecodeLimits::default(),
            signer_index: APPLE_SIGNER_INDEX,
        }
    }

    /// Bound on plist object counts and on every declared length (default 32768).
    ///
    /// Also bounds the number of SuperBlob index entries.
    pub fn max_objects(mut self, max: usize) -> Self {
        self.limits.max_objects = max;
        self
    }

    /// Bound on plist container nesting (default 256).
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = depth;
        self
    }

    /// Bound on objects materialized by one plist decode.
    pub fn max_nodes(mut self, max: usize) -> Self {
        self.limits.max_nodes = max;
        self
    }

    /// Chain position of the signing certificate (default 2).
    ///
    /// Index 2 matches Apple-issued signatures, where the chain is embedded
    /// root first. Signatures from other tooling may order it differently.
    pub fn signer_index(mut self, index: usize) -> Self {
        self.signer_index = index;
        self
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Validate the builder configuration.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_objects == 0 {
            return Err(Error::Config("max_objects must be at least 1".into()));
        }
        if self.limits.max_nodes == 0 {
            return Err(Error::Config("max_nodes must be at least 1".into()));
        }
        Ok(())
    }

    /// Decode an Info.plist buffer, binary or XML.
    pub fn decode_plist(&self, data: &[u8]) -> Result<Plist> {
        self.validate()?;
        decode_plist(data, self.limits)
    }

    /// Extract the code signature details from an executable.
    ///
    /// FAT binaries are reduced to their first architecture. Unsigned images
    /// and detached signatures produce an empty [`MachoInfo`].
    pub fn inspect_macho(&self, data: &[u8]) -> Result<MachoInfo> {
        self.validate()?;
        self.read_info(data, false)
    }

    /// Inspect an executable together with its bundle's Info.plist.
    pub fn inspect_app(&self, info_plist: &[u8], executable: &[u8]) -> Result<MachoInfo> {
        let plist = self.decode_plist(info_plist)?;
        let mut info = self.inspect_macho(executable)?;
        info.icon = Some(icon_name(&plist));
        info.info_plist = Some(plist);
        Ok(info)
    }

    /// `CFBundleExecutable` from a decoded Info.plist.
    pub fn executable_name(plist: &Plist) -> Option<&str> {
        info::executable_name(plist)
    }

    /// Read and inspect an executable file.
    pub fn inspect_file(&self, executable: impl AsRef<Path>) -> Result<MachoInfo> {
        let data = std::fs::read(executable.as_ref())?;
        self.inspect_macho(&data)
    }

    /// Read and inspect an Info.plist and executable from disk.
    pub fn inspect_app_files(
        &self,
        info_plist: impl AsRef<Path>,
        executable: impl AsRef<Path>,
    ) -> Result<MachoInfo> {
        let plist = std::fs::read(info_plist.as_ref())?;
        let binary = std::fs::read(executable.as_ref())?;
        self.inspect_app(&plist, &binary)
    }

    fn read_info(&self, data: &[u8], in_fat: bool) -> Result<MachoInfo> {
        if is_fat(data)? {
            if in_fat {
                return Err(Error::MachO("FAT slice is itself a FAT binary".into()));
            }
            return self.read_info(first_fat_slice(data)?, true);
        }

        let mut info = MachoInfo::default();
        let macho = MachOFile::parse(data)?;
        let Some(command) = macho.find_code_signature()? else {
            debug!("no LC_CODE_SIGNATURE, binary is unsigned");
            return Ok(info);
        };

        let region = macho.signature_region(&command)?;
        let signature = EmbeddedSignature::extract(region, self.limits.max_objects)?;

        info.entitlements = signature.entitlements;
        if let Some(der) = signature.cms {
            self.apply_certificates(&mut info, der);
        }
        Ok(info)
    }

    fn apply_certificates(&self, info: &mut MachoInfo, der: &[u8]) {
        let chain = match CertificateChain::from_der(der) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("could not decode CMS signature: {}", e);
                return;
            }
        };

        match chain.signer(self.signer_index) {
            Some(signer) => {
                info.common_name = signer.subject_common_name();
                info.certificate_pem = Some(signer.encode_pem());
            }
            None => warn!(
                "certificate chain has {} entries, no signer at index {}",
                chain.len(),
                self.signer_index
            ),
        }
        info.certificates = chain.into_certificates();
    }
}
