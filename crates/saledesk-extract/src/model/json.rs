use serde_json::Value;

/// Returns the first well-formed JSON object embedded in `text`.
///
/// Models sometimes wrap their answer in prose or a fenced code block. Each
/// `{` is tried as a start position; the first one that yields a complete
/// object wins.
#[must_use]
pub fn first_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    for (start, _) in text.match_indices('{') {
        let Some(end) = matching_brace(&text[start..]) else {
            continue;
        };
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..start + end]) {
            return Some(map);
        }
    }
    None
}

/// Byte length of the balanced `{...}` at the start of `s`, skipping braces
/// inside string literals.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let obj = first_json_object(r#"{"salePrice": 200}"#).unwrap();
        assert_eq!(obj["salePrice"], 200);
    }

    #[test]
    fn tolerates_surrounding_prose_and_fences() {
        let text = "Here is the data:\n```json\n{\"name\": \"Ankle Boot\", \"salePrice\": 128}\n```\nLet me know!";
        let obj = first_json_object(text).unwrap();
        assert_eq!(obj["name"], "Ankle Boot");
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"{"name": "Boot {limited}", "salePrice": 10}"#;
        let obj = first_json_object(text).unwrap();
        assert_eq!(obj["name"], "Boot {limited}");
    }

    #[test]
    fn skips_malformed_leading_braces() {
        let text = r#"{not json} then {"salePrice": 5}"#;
        let obj = first_json_object(text).unwrap();
        assert_eq!(obj["salePrice"], 5);
    }

    #[test]
    fn returns_none_without_object() {
        assert!(first_json_object("no structured data here").is_none());
        assert!(first_json_object("{\"unterminated\": 1").is_none());
    }
}
