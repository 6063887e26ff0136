//! PDF header inspection (pure; no engine involvement).

use std::sync::LazyLock;

use regex::bytes::Regex;

/// How many leading bytes are inspected for the version marker.
const VERSION_SNIFF_WINDOW: usize = 1024;

static VERSION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%PDF-(\d\.\d)").unwrap());

/// Extract the declared `%PDF-x.y` format version from a document's first
/// bytes.
///
/// Only the first KiB is inspected; some producers prepend junk before the
/// header, so the marker is searched rather than anchored. Documents that do
/// not declare a version there resolve to `None` and callers substitute
/// [`FALLBACK_PDF_VERSION`](crate::constants::FALLBACK_PDF_VERSION).
pub fn sniff_pdf_version(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(VERSION_SNIFF_WINDOW)];
    VERSION_MARKER
        .captures(window)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_declared_version() {
        assert_eq!(sniff_pdf_version(b"%PDF-1.7\n...").as_deref(), Some("1.7"));
        assert_eq!(sniff_pdf_version(b"%PDF-2.0\nxref").as_deref(), Some("2.0"));
    }

    #[test]
    fn tolerates_junk_before_the_header() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"garbage %PDF-1.4 rest");
        assert_eq!(sniff_pdf_version(&bytes).as_deref(), Some("1.4"));
    }

    #[test]
    fn missing_marker_yields_none() {
        assert_eq!(sniff_pdf_version(b"not a pdf at all"), None);
        assert_eq!(sniff_pdf_version(b""), None);
    }

    #[test]
    fn marker_past_the_window_is_ignored() {
        let mut bytes = vec![b' '; 1024];
        bytes.extend_from_slice(b"%PDF-1.6");
        assert_eq!(sniff_pdf_version(&bytes), None);

        let mut bytes = vec![b' '; 1016];
        bytes.extend_from_slice(b"%PDF-1.6");
        assert_eq!(sniff_pdf_version(&bytes).as_deref(), Some("1.6"));
    }

    #[test]
    fn sniffing_is_idempotent() {
        let bytes = b"%PDF-1.3 body";
        assert_eq!(sniff_pdf_version(bytes), sniff_pdf_version(bytes));
    }
}
