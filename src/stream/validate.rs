/// Cheap completeness check run before a full parse.
///
/// Tracks string state, single-character escapes and brace depth. Returns `true` when the
/// scan ends outside a string with every brace closed. Balanced input that is not valid JSON
/// still passes; the parser rejects it afterwards.
pub fn is_complete_json_object(input: &str) -> bool {
    if input.trim().is_empty() {
        return false;
    }

    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }

    !in_string && depth == 0
}
