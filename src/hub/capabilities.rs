//! Hub feature negotiation from the reported release string

/// First release where inverted percentage blinds stopped reporting position
const INVERTED_BLIND_CUTOFF: HubRelease = HubRelease::Dated {
    year: 2022,
    minor: 1,
};

/// A parsed hub release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HubRelease {
    /// `3.x`/`4.x` numbering, predates every dated release
    Legacy { major: u32, minor: u32 },
    /// `YYYY.N` numbering
    Dated { year: u32, minor: u32 },
}

impl HubRelease {
    /// Parse the leading `major.minor` of a release string
    ///
    /// Accepts forms such as `2023.2`, `2022.1 (build 14535)` and `4.10717`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.split_whitespace().next()?;
        let mut parts = token.trim_start_matches(['v', 'V']).split('.');
        let major: u32 = parts.next()?.parse().ok()?;
        let minor: u32 = parts
            .next()
            .map(|s| s.chars().take_while(char::is_ascii_digit).collect::<String>())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        match major {
            2000.. => Some(Self::Dated { year: major, minor }),
            1..100 => Some(Self::Legacy { major, minor }),
            _ => None,
        }
    }
}

/// What the connected hub release supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubCapabilities {
    release: Option<HubRelease>,
}

impl HubCapabilities {
    /// Negotiate capabilities from a release string
    ///
    /// A missing or unparseable string is treated as the newest release.
    #[must_use]
    pub fn negotiate(version: Option<&str>) -> Self {
        let release = version.and_then(|raw| {
            let parsed = HubRelease::parse(raw);
            if parsed.is_none() {
                tracing::debug!(version = %raw, "unrecognised hub version, assuming newest");
            }
            parsed
        });
        Self { release }
    }

    #[must_use]
    pub const fn release(&self) -> Option<HubRelease> {
        self.release
    }

    fn older_than(&self, cutoff: HubRelease) -> bool {
        self.release.is_some_and(|release| release < cutoff)
    }

    /// Whether a blind with this switch type reports its lift position
    #[must_use]
    pub fn blind_position_retrievable(&self, switch_type: &str) -> bool {
        match switch_type {
            "Blinds Percentage Inverted" => self.older_than(INVERTED_BLIND_CUTOFF),
            s => s.starts_with("Blinds Percentage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release() {
        assert_eq!(
            HubRelease::parse("2023.2"),
            Some(HubRelease::Dated { year: 2023, minor: 2 })
        );
        assert_eq!(
            HubRelease::parse("2022.1 (build 14535)"),
            Some(HubRelease::Dated { year: 2022, minor: 1 })
        );
        assert_eq!(
            HubRelease::parse("4.10717"),
            Some(HubRelease::Legacy { major: 4, minor: 10717 })
        );
        assert_eq!(HubRelease::parse("beta"), None);
        assert_eq!(HubRelease::parse(""), None);
    }

    #[test]
    fn test_legacy_sorts_before_dated() {
        let legacy = HubRelease::Legacy { major: 4, minor: 99999 };
        assert!(legacy < INVERTED_BLIND_CUTOFF);
    }

    #[test]
    fn test_inverted_blind_gate() {
        let old = HubCapabilities::negotiate(Some("2021.1"));
        let legacy = HubCapabilities::negotiate(Some("4.10717"));
        let cutoff = HubCapabilities::negotiate(Some("2022.1"));
        let new = HubCapabilities::negotiate(Some("2024.7"));

        assert!(old.blind_position_retrievable("Blinds Percentage Inverted"));
        assert!(legacy.blind_position_retrievable("Blinds Percentage Inverted"));
        assert!(!cutoff.blind_position_retrievable("Blinds Percentage Inverted"));
        assert!(!new.blind_position_retrievable("Blinds Percentage Inverted"));
    }

    #[test]
    fn test_unknown_version_is_newest() {
        for caps in [
            HubCapabilities::negotiate(None),
            HubCapabilities::negotiate(Some("custom-build")),
        ] {
            assert!(caps.release().is_none());
            assert!(!caps.blind_position_retrievable("Blinds Percentage Inverted"));
            assert!(caps.blind_position_retrievable("Blinds Percentage"));
            assert!(!caps.blind_position_retrievable("Blinds"));
        }
    }
}
