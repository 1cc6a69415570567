//! Human-readable capability names for entitlement identifiers.
//!
//! The lookup is a substring match against the raw entitlements plist text;
//! the XML is not parsed.

/// `(label, entitlement identifier)` pairs, in display order.
pub const ENTITLEMENT_FEATURES: &[(&str, &str)] = &[
    ("CarPlay", "com.apple.developer.carplay"),
    ("Contacts", "com.apple.developer.contacts"),
    ("Exposure Notifications", "com.apple.developer.exposure-notification"),
    ("Game Center", "com.apple.developer.game-center"),
    ("Group Activities", "com.apple.developer.group-session"),
    ("Health Services", "com.apple.developer.healthkit"),
    ("Home Automation", "com.apple.developer.homekit"),
    ("iCloud Services", "com.apple.developer.icloud"),
    ("Networking Services", "com.apple.developer.networking"),
    ("Push Notifications", "aps-environment"),
    ("Sensors", "com.apple.developer.sensorkit.reader.allow"),
    ("Siri", "com.apple.developer.siri"),
    ("ClassKit", "com.apple.developer.ClassKit-environment"),
    ("SignIn with Apple", "com.apple.developer.applesignin"),
    (
        "AutoFill",
        "com.apple.developer.authentication-services.autofill-credential-provider",
    ),
];

/// Labels of every known capability whose identifier appears in `entitlements`.
pub fn readable_entitlements(entitlements: &str) -> Vec<&'static str> {
    ENTITLEMENT_FEATURES
        .iter()
        .filter(|(_, identifier)| entitlements.contains(identifier))
        .map(|(label, _)| *label)
        .collect()
}
