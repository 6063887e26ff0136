//! Cross-cutting constants for the compression worker.

/// Input file name inside an engine session's private filesystem.
pub const ENGINE_INPUT_NAME: &str = "in.pdf";

/// Output file name inside an engine session's private filesystem.
pub const ENGINE_OUTPUT_NAME: &str = "out.pdf";

/// Format version assumed when the document does not declare one.
pub const FALLBACK_PDF_VERSION: &str = "1.5";

/// Engine log lines retained for failure diagnostics.
pub const ERROR_LOG_TAIL_LINES: usize = 8;
