use regex::Regex;
use std::sync::LazyLock;

/// SGR colour codes and erase-line sequences, with either the 7-bit
/// (`ESC [`) or the 8-bit (`CSI`) introducer
static ANSI_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x1b\x{9b}]\[[0-9;]*[mK]").expect("valid ANSI regex"));

/// Strip ANSI escape sequences and surrounding whitespace.
///
/// Removal repeats until nothing matches, so nested fragments such as
/// `"\x1b\x1b[0m[31m"` cannot reassemble into a new sequence and the
/// function is idempotent.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    while ANSI_SEQUENCE.is_match(&current) {
        current = ANSI_SEQUENCE.replace_all(&current, "").into_owned();
    }
    current.trim().to_string()
}

/// Sanitized first line of an error message
pub fn sanitize_message(text: &str) -> String {
    let sanitized = sanitize(text);
    sanitized
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_colour_codes() {
        let raw = "\x1b[31mexpected\x1b[39m \x1b[1;32mtrue\x1b[0m\x1b[K  ";
        assert_eq!(sanitize(raw), "expected true");
    }

    #[test]
    fn test_csi_introducer() {
        assert_eq!(sanitize("\u{9b}[33mwarn\u{9b}[0m"), "warn");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "\x1b[31mboom\x1b[0m",
            "\x1b\x1b[0m[31mnested\x1b[0m",
            "  \n\x1b[2K\tline one\nline two  ",
            "no codes here",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_plain_text_is_only_trimmed() {
        assert_eq!(sanitize("  plain [text] m K  "), "plain [text] m K");
    }

    #[test]
    fn test_message_keeps_first_line() {
        let raw = "\x1b[31mAssertionError: expected 1 to equal 2\x1b[0m\r\n    at Context.<anonymous>";
        assert_eq!(
            sanitize_message(raw),
            "AssertionError: expected 1 to equal 2"
        );
        assert_eq!(sanitize_message(""), "");
    }
}
