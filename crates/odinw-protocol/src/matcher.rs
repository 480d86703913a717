//! Expectation matching for decoded messages.
//!
//! A receive call hands the matcher one decoded frame (EDM) or the
//! accumulated response text so far (command mode) together with an ordered
//! list of [`Expectation`]s. The matcher returns every expectation the input
//! satisfies, each paired with the full decoded content so callers can
//! extract structured fields from it afterwards.

use crate::types::{Expectation, Message, MessageType};

/// Check whether `needle` occurs as a contiguous sub-sequence of `haystack`.
///
/// An empty needle matches everything.
pub fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

impl Expectation {
    /// Whether a message with the given type and content satisfies this
    /// expectation.
    ///
    /// A `None` type or content on the expectation side is a wildcard. A
    /// non-empty expected content never matches an absent content.
    pub fn matches(&self, msg_type: Option<MessageType>, content: Option<&[u8]>) -> bool {
        if let Some(expected_type) = self.msg_type {
            if msg_type != Some(expected_type) {
                return false;
            }
        }
        match &self.content {
            None => true,
            Some(needle) => contains_subsequence(content.unwrap_or_default(), needle),
        }
    }
}

/// Filter an ordered expectation list against one decoded input.
///
/// Every satisfied expectation yields a [`Message`] carrying the input's
/// full content (not the pattern's). An empty expectation list, or an input
/// satisfying nothing, yields an empty vec.
pub fn match_expectations(
    expectations: &[Expectation],
    msg_type: Option<MessageType>,
    content: Option<&[u8]>,
) -> Vec<Message> {
    expectations
        .iter()
        .filter(|expectation| expectation.matches(msg_type, content))
        .map(|expectation| Message {
            msg_type: expectation.msg_type,
            content: content.map(<[u8]>::to_vec),
        })
        .collect()
}

/// Filter an ordered expectation list against accumulated command-mode text.
///
/// The text protocol carries no type tag, so pattern types are ignored
/// outright and every returned [`Message`] is untyped. Content matching is
/// the same sub-sequence rule as [`match_expectations`].
pub fn match_text_expectations(expectations: &[Expectation], text: &[u8]) -> Vec<Message> {
    expectations
        .iter()
        .filter(|expectation| match &expectation.content {
            None => true,
            Some(needle) => contains_subsequence(text, needle),
        })
        .map(|_| Message {
            msg_type: None,
            content: Some(text.to_vec()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsequence_search() {
        assert!(contains_subsequence(b"+UUDPC:1,OK", b"OK"));
        assert!(contains_subsequence(b"OK", b"OK"));
        assert!(!contains_subsequence(b"ERROR", b"OK"));
        assert!(!contains_subsequence(b"O", b"OK"));
        assert!(contains_subsequence(b"", b""));
        assert!(contains_subsequence(b"anything", b""));
    }

    #[test]
    fn test_typed_match_requires_tag() {
        let expectation = Expectation::typed(MessageType::AtConfirm, "OK");
        assert!(expectation.matches(Some(MessageType::AtConfirm), Some(b"\r\nOK\r\n")));
        assert!(!expectation.matches(Some(MessageType::AtEvent), Some(b"\r\nOK\r\n")));
        assert!(!expectation.matches(None, Some(b"\r\nOK\r\n")));
    }

    #[test]
    fn test_type_wildcard_accepts_any_tag() {
        let expectation = Expectation::text("OK");
        assert!(expectation.matches(Some(MessageType::AtConfirm), Some(b"OK")));
        assert!(expectation.matches(None, Some(b"OK")));
    }

    #[test]
    fn test_content_wildcard_accepts_any_content() {
        let expectation = Expectation::any_content(MessageType::DataEvent);
        assert!(expectation.matches(Some(MessageType::DataEvent), Some(b"\x01payload")));
        assert!(expectation.matches(Some(MessageType::DataEvent), Some(b"")));
        assert!(expectation.matches(Some(MessageType::DataEvent), None));
    }

    #[test]
    fn test_nonempty_needle_never_matches_absent_content() {
        let expectation = Expectation::typed(MessageType::AtConfirm, "OK");
        assert!(!expectation.matches(Some(MessageType::AtConfirm), None));
    }

    #[test]
    fn test_match_returns_full_content() {
        let expectations = vec![
            Expectation::typed(MessageType::AtConfirm, "OK"),
            Expectation::typed(MessageType::AtConfirm, "ERROR"),
        ];
        let content = b"\r\n+UWCL:1,6,11\r\nOK\r\n";
        let matched = match_expectations(
            &expectations,
            Some(MessageType::AtConfirm),
            Some(content),
        );
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].msg_type, Some(MessageType::AtConfirm));
        assert_eq!(matched[0].content.as_deref(), Some(content.as_slice()));
    }

    #[test]
    fn test_multiple_expectations_can_match_one_input() {
        let expectations = vec![
            Expectation::text("+UUDPC"),
            Expectation::text("OK"),
        ];
        let matched = match_expectations(&expectations, None, Some(b"+UUDPC:1,OK"));
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_empty_expectation_list_matches_nothing() {
        let matched = match_expectations(&[], Some(MessageType::StartEvent), None);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_text_match_ignores_pattern_types() {
        let expectations = vec![
            Expectation::typed(MessageType::AtConfirm, "OK"),
            Expectation::text("OK"),
        ];
        let matched = match_text_expectations(&expectations, b"\r\nOK\r\n");
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|message| message.msg_type.is_none()));
        assert_eq!(matched[0].content.as_deref(), Some(b"\r\nOK\r\n".as_slice()));
    }
}
