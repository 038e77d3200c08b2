//! User-Agent string for all outgoing requests.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/filmfetch";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("filmfetch/{version} (dataset-extraction-tool; +{PROJECT_UA_URL})")
}
