//! Reply formatting.
//!
//! Answers go out as HTML inside an expandable block quote so long answers
//! stay collapsed in busy group chats.

/// Render a stored answer as an expandable HTML block quote.
///
/// Literal `<span>` tags are escaped and `<pre>` tags are dropped, since
/// neither renders inside a block quote; every other tag passes through.
pub fn format_answer(answer: &str) -> String {
    let escaped = escape_answer_tags(answer);
    format!("<blockquote expandable>{escaped}</blockquote>")
}

fn escape_answer_tags(text: &str) -> String {
    text.replace("<span>", "&lt;span&gt;")
        .replace("</span>", "&lt;/span&gt;")
        .replace("<pre>", "")
        .replace("</pre>", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_answer_is_quoted() {
        assert_eq!(
            format_answer("Use the reset link."),
            "<blockquote expandable>Use the reset link.</blockquote>"
        );
    }

    #[test]
    fn test_span_escaped_and_pre_removed() {
        assert_eq!(
            format_answer("<pre>run</pre> then <span>x</span><br><b>ok</b>"),
            "<blockquote expandable>run then &lt;span&gt;x&lt;/span&gt;<br><b>ok</b></blockquote>"
        );
    }
}
