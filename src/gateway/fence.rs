//! Cleanup of model responses before JSON decoding

/// Strip surrounding whitespace and a leading/trailing triple-backtick fence
///
/// Handles both bare fences and fences with a language tag (```json).
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    let fenced = body.starts_with("```");

    if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    if fenced {
        // Drop the language tag, if any, up to the end of the fence line
        match body.find('\n') {
            Some(idx) if is_language_tag(&body[..idx]) => body = &body[idx + 1..],
            None if is_language_tag(body) => body = "",
            // One-line fence: "```json {...}```"
            None => {
                if let Some((tag, rest)) = body.trim_start().split_once(char::is_whitespace) {
                    if !tag.is_empty() && is_language_tag(tag) {
                        body = rest;
                    }
                }
            }
            _ => {}
        }
    }

    body.trim()
}

fn is_language_tag(tag: &str) -> bool {
    tag.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_json_fence() {
        let text = "```json\n{\"symbol\": \"BTC\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"symbol\": \"BTC\"}");
    }

    #[test]
    fn test_strips_bare_fence_and_whitespace() {
        let text = "\n\n  ```\n{\"a\": 1}\n```  \n";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_single_line_fence() {
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_single_line_fence_with_language_tag() {
        assert_eq!(
            strip_code_fences("```json {\"symbol\": \"BTC\"}```"),
            "{\"symbol\": \"BTC\"}"
        );
        assert_eq!(strip_code_fences("``` json  [1, 2] ```"), "[1, 2]");
    }

    #[test]
    fn test_unfenced_text_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_empty_fence() {
        assert_eq!(strip_code_fences("```json```"), "");
    }
}
