/// Splits chatbot reply text into plain-text and fenced-code segments.
///
/// Pure and total: any input string, including unbalanced fences, produces
/// a segment list without panicking.

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code {
        language: Option<String>,
        content: String,
    },
}

/// Split `input` on triple-backtick fences. Pieces at odd indices are code,
/// even indices are text. A code piece whose first line is a single word
/// (no embedded spaces) is treated as a language tag and stripped from the
/// content. Empty pieces are dropped, except that empty input yields one
/// empty text segment so callers always have something to render.
pub fn split_segments(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for (idx, piece) in input.split(FENCE).enumerate() {
        if piece.is_empty() {
            continue;
        }
        if idx % 2 == 1 {
            let (language, content) = strip_language_tag(piece);
            segments.push(Segment::Code { language, content });
        } else {
            segments.push(Segment::Text(piece.to_string()));
        }
    }

    if segments.is_empty() {
        segments.push(Segment::Text(input.to_string()));
    }

    segments
}

/// Split a text segment into paragraphs on newlines, the way the original
/// rendered prose between code blocks. Blank lines are preserved as empty
/// paragraphs so spacing survives.
pub fn paragraphs(text: &str) -> Vec<&str> {
    text.lines().collect()
}

fn strip_language_tag(piece: &str) -> (Option<String>, String) {
    match piece.split_once('\n') {
        Some((first, rest)) => {
            let tag = first.trim_end_matches('\r');
            if !tag.is_empty() && !tag.contains(' ') {
                (Some(tag.to_string()), rest.to_string())
            } else {
                (None, piece.to_string())
            }
        }
        // Single-line code block with no tag line.
        None => (None, piece.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_code_text() {
        let segments = split_segments("a```js\ncode```b");
        assert_eq!(
            segments,
            vec![
                Segment::Text("a".to_string()),
                Segment::Code {
                    language: Some("js".to_string()),
                    content: "code".to_string(),
                },
                Segment::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_delimiters_is_single_text_segment() {
        let input = "just a plain answer";
        assert_eq!(
            split_segments(input),
            vec![Segment::Text(input.to_string())]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(split_segments(""), vec![Segment::Text(String::new())]);
    }

    #[test]
    fn test_odd_delimiter_count_still_returns_list() {
        // Unclosed fence: the trailing piece is classified by parity (code).
        let segments = split_segments("before```py\nprint(1)");
        assert_eq!(
            segments,
            vec![
                Segment::Text("before".to_string()),
                Segment::Code {
                    language: Some("py".to_string()),
                    content: "print(1)".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_tag_line_with_spaces_is_content() {
        let segments = split_segments("```not a tag\ncode```");
        assert_eq!(
            segments,
            vec![Segment::Code {
                language: None,
                content: "not a tag\ncode".to_string(),
            }]
        );
    }

    #[test]
    fn test_single_line_code_has_no_tag() {
        let segments = split_segments("```ls -la```");
        assert_eq!(
            segments,
            vec![Segment::Code {
                language: None,
                content: "ls -la".to_string(),
            }]
        );
    }

    #[test]
    fn test_adjacent_fences_drop_empty_pieces() {
        let segments = split_segments("``````text");
        assert_eq!(segments, vec![Segment::Text("text".to_string())]);
    }

    #[test]
    fn test_crlf_tag_line() {
        let segments = split_segments("```rust\r\nfn main() {}```");
        assert_eq!(
            segments,
            vec![Segment::Code {
                language: Some("rust".to_string()),
                content: "fn main() {}".to_string(),
            }]
        );
    }

    #[test]
    fn test_idempotent_for_plain_text() {
        let once = split_segments("hello world");
        if let Segment::Text(text) = &once[0] {
            assert_eq!(split_segments(text), once);
        } else {
            panic!("expected text segment");
        }
    }

    #[test]
    fn test_paragraphs_split_on_newlines() {
        assert_eq!(paragraphs("one\ntwo\n\nthree"), vec!["one", "two", "", "three"]);
    }
}
