use regex::Regex;
use std::env;
use std::sync::OnceLock;

fn env_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

/// Expand environment variables in a string using ${VAR_NAME} syntax
pub fn expand_env_var_in_string(value: &str) -> String {
    let mut result = value.to_string();

    for cap in env_var_re().captures_iter(value) {
        let var_name = &cap[1];
        let replacement = env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name));
        result = result.replace(&cap[0], &replacement);
    }

    result
}

/// Normalize an API base URL: env vars expanded, trailing slashes removed, http(s) only.
pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let expanded = expand_env_var_in_string(raw.trim());
    let trimmed = expanded.trim_end_matches('/');

    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| format!("Invalid API base URL '{}': {}", trimmed, e))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(format!(
            "Unsupported URL scheme '{}' in API base URL '{}'",
            other, trimmed
        )),
    }
}
