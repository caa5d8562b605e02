//! Completion endpoint normalisation.

/// Map an operator-supplied base URL to its chat completions endpoint.
///
/// Accepts both `https://host` and `https://host/v1` (with or without a
/// trailing slash) and never produces `/v1/v1`. Nothing else is validated.
pub fn normalize(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        format!("{trimmed}/chat/completions")
    } else {
        format!("{trimmed}/v1/chat/completions")
    }
}
