// ============================================================================
// Log Sanitization - vendor payloads and credentials
// ============================================================================
//
// ERP responses are logged on failure. Bodies come from third-party systems,
// can be large HTML error pages, and may echo request data back. Everything
// logged from a vendor goes through `sanitize_for_log` first, and credentials
// only ever appear through `mask_secret`.
//
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters of a vendor body written to the log
const MAX_LOG_LENGTH: usize = 500;

static ANSI_ESCAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("valid ANSI escape pattern")
});

static WHITESPACE_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));

/// Make a vendor payload safe to log on a single line.
///
/// Strips ANSI escapes and control characters, collapses whitespace runs
/// (newlines included), and truncates on a character boundary.
///
/// ```
/// use erp_bridge::utils::log_sanitizer::sanitize_for_log;
///
/// assert_eq!(sanitize_for_log("bad\nrequest"), "bad request");
/// assert_eq!(sanitize_for_log("\x1b[31mПомилка\x1b[0m"), "Помилка");
/// ```
pub fn sanitize_for_log(input: &str) -> String {
    let no_ansi = ANSI_ESCAPE_REGEX.replace_all(input, "");

    let printable: String = no_ansi
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let collapsed = WHITESPACE_RUN_REGEX.replace_all(printable.trim(), " ");

    if collapsed.chars().count() > MAX_LOG_LENGTH {
        let truncated: String = collapsed.chars().take(MAX_LOG_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        collapsed.into_owned()
    }
}

/// Show only the first four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
