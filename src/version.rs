//! Platform version compatibility.

use semver::Version;

use crate::schema::Diagnostic;

/// Oldest platform version whose API this provider understands.
pub const MIN_SUPPORTED_VERSION: &str = "4.0.0-beta.380";

/// Outcome of comparing the platform version with [`MIN_SUPPORTED_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Version is at least the minimum.
    Supported(Version),
    /// Version is older than the minimum.
    Unsupported(Version),
    /// The platform reported something that is not a semantic version.
    Unparseable(String),
}

fn parse(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_matches('"');
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Compare a version string reported by `GET /version`.
pub fn check_version(raw: &str) -> VersionCheck {
    let Some(minimum) = parse(MIN_SUPPORTED_VERSION) else {
        return VersionCheck::Unparseable(MIN_SUPPORTED_VERSION.to_string());
    };
    match parse(raw) {
        Some(version) if version >= minimum => VersionCheck::Supported(version),
        Some(version) => VersionCheck::Unsupported(version),
        None => VersionCheck::Unparseable(raw.trim().to_string()),
    }
}

impl VersionCheck {
    /// Diagnostics to attach to the configure response.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Supported(_) => Vec::new(),
            Self::Unsupported(version) => vec![Diagnostic::error("Unsupported platform version")
                .with_detail(format!(
                    "The platform reports version {}; this provider requires {} or newer.",
                    version, MIN_SUPPORTED_VERSION
                ))],
            Self::Unparseable(raw) => vec![Diagnostic::warning("Unable to parse platform version")
                .with_detail(format!(
                    "The platform reported version {:?}. Compatibility with {} or newer could not be verified.",
                    raw, MIN_SUPPORTED_VERSION
                ))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_is_supported() {
        assert!(matches!(check_version("4.0.0-beta.380"), VersionCheck::Supported(_)));
    }

    #[test]
    fn test_prerelease_ordering() {
        assert!(matches!(check_version("4.0.0-beta.379"), VersionCheck::Unsupported(_)));
        assert!(matches!(check_version("4.0.0-beta.400"), VersionCheck::Supported(_)));
        assert!(matches!(check_version("4.0.0"), VersionCheck::Supported(_)));
        assert!(matches!(check_version("3.12.36"), VersionCheck::Unsupported(_)));
    }

    #[test]
    fn test_quoted_and_prefixed() {
        assert!(matches!(check_version("\"v4.0.0-beta.420\"\n"), VersionCheck::Supported(_)));
    }

    #[test]
    fn test_diagnostics() {
        assert!(check_version("4.1.0").diagnostics().is_empty());

        let diags = check_version("4.0.0-beta.100").diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert_eq!(diags[0].summary, "Unsupported platform version");

        let diags = check_version("nightly").diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
    }
}
