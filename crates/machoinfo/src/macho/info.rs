//! Summary record produced by inspecting an app executable.

use x509_certificate::CapturedX509Certificate;

use crate::entitlements::readable_entitlements;
use crate::plist::Plist;

/// Info.plist keys leading to the primary icon file list.
pub const ICON_FILES_PATH: &[&str] = &["CFBundleIcons", "CFBundlePrimaryIcon", "CFBundleIconFiles"];

/// Icon name used when the Info.plist lists none.
pub const DEFAULT_ICON: &str = "Icon";

/// Info.plist key naming the bundle executable.
pub const EXECUTABLE_KEY: &str = "CFBundleExecutable";

/// What could be learned about a signed app.
///
/// Fields stay `None` (or empty) when the binary is unsigned, the signature
/// is detached, or the corresponding blob is missing.
#[derive(Debug, Clone, Default)]
pub struct MachoInfo {
    /// Subject common name of the signing certificate.
    pub common_name: Option<String>,
    /// Entitlements plist text, verbatim.
    pub entitlements: Option<String>,
    /// Signing certificate as a `CERTIFICATE` PEM document.
    pub certificate_pem: Option<String>,
    /// Every certificate in the CMS signature, in encoded order.
    pub certificates: Vec<CapturedX509Certificate>,
    /// The decoded Info.plist, when one was supplied.
    pub info_plist: Option<Plist>,
    /// Name prefix of the icon file to load from the bundle.
    pub icon: Option<String>,
}

impl MachoInfo {
    /// Whether an embedded signature contributed anything.
    pub fn is_signed(&self) -> bool {
        self.entitlements.is_some() || !self.certificates.is_empty()
    }

    /// Capability labels for the embedded entitlements.
    pub fn capabilities(&self) -> Vec<&'static str> {
        self.entitlements
            .as_deref()
            .map(readable_entitlements)
            .unwrap_or_default()
    }
}

/// `CFBundleExecutable` from an Info.plist.
pub fn executable_name(plist: &Plist) -> Option<&str> {
    plist.string_at(&[EXECUTABLE_KEY])
}

/// Last entry of the primary icon file list, or [`DEFAULT_ICON`].
pub fn icon_name(plist: &Plist) -> String {
    plist
        .strings_at(ICON_FILES_PATH)
        .and_then(|files| files.last().map(|name| name.to_string()))
        .unwrap_or_else(|| DEFAULT_ICON.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plist::{BplistValue, Dictionary};

    fn dict(entries: Vec<(&str, BplistValue)>) -> BplistValue {
        BplistValue::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<Dictionary>(),
        )
    }

    #[test]
    fn test_icon_name_takes_last_file() {
        let plist = Plist::Binary(dict(vec![(
            "CFBundleIcons",
            dict(vec![(
                "CFBundlePrimaryIcon",
                dict(vec![(
                    "CFBundleIconFiles",
                    BplistValue::Array(vec![
                        BplistValue::String("AppIcon20x20".into()),
                        BplistValue::String("AppIcon60x60".into()),
                    ]),
                )]),
            )]),
        )]));
        assert_eq!(icon_name(&plist), "AppIcon60x60");
    }

    #[test]
    fn test_icon_name_default() {
        let plist = Plist::Binary(dict(vec![("CFBundleExecutable", BplistValue::String("Demo".into()))]));
        assert_eq!(icon_name(&plist), DEFAULT_ICON);
        assert_eq!(executable_name(&plist), Some("Demo"));
    }

    #[test]
    fn test_capabilities() {
        let info = MachoInfo {
            entitlements: Some("<key>com.apple.developer.homekit</key>".into()),
            ..MachoInfo::default()
        };
        assert!(info.is_signed());
        assert_eq!(info.capabilities(), vec!["Home Automation"]);
        assert!(MachoInfo::default().capabilities().is_empty());
        assert!(!MachoInfo::default().is_signed());
    }
}
