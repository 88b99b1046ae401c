//! Output file naming.

/// Token used when a company name has no letters or digits left.
pub const UNKNOWN_COMPANY_TOKEN: &str = "unknown";

/// Turn a company name into a filesystem-safe token.
///
/// Spaces become `_`, `,` and `.` are dropped, and the result is lowercased.
/// Path separators, control characters and characters Windows rejects in
/// file names also become `_`, so the token is always a single path component.
/// Lossy; only used to name output files.
pub fn normalize_company_name(company_name: &str) -> String {
    let token: String = company_name
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.'))
        .map(|c| if c == ' ' || is_unsafe_in_file_name(c) { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect();

    if !token.chars().any(char::is_alphanumeric) {
        UNKNOWN_COMPANY_TOKEN.to_string()
    } else {
        token
    }
}

fn is_unsafe_in_file_name(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// `annual_report_<token>_10k.<extension>`
pub fn output_file_name(company_name: &str, extension: &str) -> String {
    format!(
        "annual_report_{}_10k.{}",
        normalize_company_name(company_name),
        extension
    )
}
