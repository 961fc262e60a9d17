//! Best-effort device family detection from display names

/// Family reported when no keyword matches
pub const UNKNOWN_FAMILY: &str = "Unknown";

/// Ordered `(family, keywords)` table. Earlier rows win.
pub type FamilyTable = &'static [(&'static str, &'static [&'static str])];

pub const CONTROLLER_FAMILIES: FamilyTable = &[
    ("Xbox", &["Xbox", "Microsoft"]),
    ("PlayStation", &["PlayStation", "Sony", "DualShock", "DualSense"]),
    ("Nintendo", &["Nintendo", "Pro Controller", "Joy-Con"]),
    ("Generic", &["USB", "Gamepad", "Controller"]),
];

pub const AUDIO_FAMILIES: FamilyTable = &[
    ("AirPods", &["AirPods", "Apple"]),
    ("Sony", &["Sony", "WH-", "WF-"]),
    ("Bose", &["Bose", "QuietComfort"]),
    ("JBL", &["JBL"]),
    ("Generic", &["Bluetooth", "Wireless", "Headset"]),
];

/// First family whose keyword occurs in `name`, ignoring case.
pub fn classify(name: &str, table: FamilyTable) -> &'static str {
    let name = name.to_lowercase();
    table
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| name.contains(&keyword.to_lowercase()))
        })
        .map(|(family, _)| *family)
        .unwrap_or(UNKNOWN_FAMILY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_families() {
        assert_eq!(classify("Xbox Wireless Controller", CONTROLLER_FAMILIES), "Xbox");
        assert_eq!(classify("DUALSENSE wireless", CONTROLLER_FAMILIES), "PlayStation");
        assert_eq!(classify("Nintendo Switch Pro Controller", CONTROLLER_FAMILIES), "Nintendo");
        assert_eq!(classify("usb gamepad", CONTROLLER_FAMILIES), "Generic");
        assert_eq!(classify("Steering Wheel", CONTROLLER_FAMILIES), UNKNOWN_FAMILY);
    }

    #[test]
    fn test_first_match_wins() {
        // "Controller" is Generic but "Microsoft" is listed earlier
        assert_eq!(classify("Microsoft Controller", CONTROLLER_FAMILIES), "Xbox");
        // Sony headphones are Sony in the audio table, PlayStation for pads
        assert_eq!(classify("Sony WH-1000XM4", AUDIO_FAMILIES), "Sony");
        assert_eq!(classify("Sony WH-1000XM4", CONTROLLER_FAMILIES), "PlayStation");
    }

    #[test]
    fn test_audio_families() {
        assert_eq!(classify("Kitchen AirPods Pro", AUDIO_FAMILIES), "AirPods");
        assert_eq!(classify("Bose QC35", AUDIO_FAMILIES), "Bose");
        assert_eq!(classify("JBL Flip 5", AUDIO_FAMILIES), "JBL");
        assert_eq!(classify("Generic Wireless Headset", AUDIO_FAMILIES), "Generic");
        assert_eq!(classify("Logitech Mouse", AUDIO_FAMILIES), UNKNOWN_FAMILY);
    }
}
