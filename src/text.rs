//! Text normalization applied to every payload before it reaches the conversation.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn unicode_escape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\\u([dD][89abAB][0-9a-fA-F]{2})\\u([dD][c-fC-F][0-9a-fA-F]{2})|\\u([0-9a-fA-F]{4})",
        )
        .expect("static regex")
    })
}

fn sources_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<sources>.*?</sources>").expect("static regex"))
}

/// Resolve `\uXXXX` escapes, then HTML character entities.
///
/// Never fails: an escape that does not name a valid code point (a lone surrogate) is kept
/// verbatim and reported through `tracing`.
pub fn decode_text(text: &str) -> String {
    let unescaped = decode_unicode_escapes(text);
    html_escape::decode_html_entities(&unescaped).into_owned()
}

pub fn decode_unicode_escapes(text: &str) -> String {
    if !text.contains("\\u") {
        return text.to_string();
    }

    unicode_escape_re()
        .replace_all(text, |caps: &Captures| {
            let decoded = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(high), Some(low), _) => {
                    let high = u32::from_str_radix(high.as_str(), 16).unwrap_or(0);
                    let low = u32::from_str_radix(low.as_str(), 16).unwrap_or(0);
                    char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                }
                (_, _, Some(single)) => u32::from_str_radix(single.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32),
                _ => None,
            };

            match decoded {
                Some(c) => c.to_string(),
                None => {
                    tracing::warn!(escape = %&caps[0], "could not decode unicode escape");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Remove `<sources>...</sources>` citation blocks before display.
pub fn strip_sources(content: &str) -> String {
    sources_re().replace_all(content, "").into_owned()
}
