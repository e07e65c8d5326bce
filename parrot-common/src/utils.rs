//! Content transformation helpers for relayed messages.

/// Zero-width space inserted after `@` to defuse mentions.
const ZWSP: char = '\u{200B}';

/// Escapes mentions in message content so relayed text cannot ping
/// `@everyone`, roles, or users on the receiving side.
pub fn escape_mentions(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        out.push(c);
        if c == '@' {
            out.push(ZWSP);
        }
    }
    out
}

/// Truncates message content to at most `max_chars` characters,
/// appending an ellipsis when anything was cut.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let kept: String = content.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}

/// Reverses message content character-wise for reverse-mode calls.
pub fn reverse_content(content: &str) -> String {
    content.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_mentions() {
        let escaped = escape_mentions("hey @everyone look");
        assert_eq!(escaped, "hey @\u{200B}everyone look");

        // No mentions, no change
        assert_eq!(escape_mentions("plain text"), "plain text");
    }

    #[test]
    fn test_escape_mentions_user_ping() {
        let escaped = escape_mentions("<@123456789>");
        assert_eq!(escaped, "<@\u{200B}123456789>");
    }

    #[test]
    fn test_truncate_content_short() {
        assert_eq!(truncate_content("hello", 10), "hello");
        assert_eq!(truncate_content("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_content_long() {
        let truncated = truncate_content("hello world", 8);
        assert_eq!(truncated.chars().count(), 8);
        assert!(truncated.ends_with('\u{2026}'));
    }

    #[test]
    fn test_truncate_content_multibyte() {
        // Must not panic on non-ASCII boundaries
        let truncated = truncate_content("héllö wörld", 6);
        assert_eq!(truncated.chars().count(), 6);
    }

    #[test]
    fn test_reverse_content() {
        assert_eq!(reverse_content("hello"), "olleh");
        assert_eq!(reverse_content(""), "");
        assert_eq!(reverse_content("héllo"), "olléh");
    }
}
