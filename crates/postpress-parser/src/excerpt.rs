//! Excerpt derivation from a post body.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Drop top-level MDX `import`/`export` lines, which are code rather than prose.
///
/// Lines inside fenced code blocks are kept verbatim.
pub fn strip_esm(body: &str) -> String {
    let mut open_fence: Option<(char, usize)> = None;

    body.lines()
        .filter(|line| {
            if let Some((marker, run, info)) = code_fence(line) {
                match open_fence {
                    None => open_fence = Some((marker, run)),
                    Some((open, len)) if open == marker && run >= len && info.is_empty() => {
                        open_fence = None;
                    }
                    Some(_) => {}
                }
                return true;
            }
            open_fence.is_some() || !(line.starts_with("import ") || line.starts_with("export "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a code fence line into its marker, run length and info string.
fn code_fence(line: &str) -> Option<(char, usize, &str)> {
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        return None;
    }
    let marker = rest.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let run = rest.chars().take_while(|c| *c == marker).count();
    (run >= 3).then(|| (marker, run, rest[run..].trim()))
}

/// Derive a plain-text excerpt of at most `max_chars` characters.
///
/// Text is taken from the leading paragraphs; headings, code blocks and raw
/// HTML are skipped. When the text is cut, the cut falls on a word boundary
/// and `…` is appended.
pub fn derive_excerpt(body: &str, max_chars: usize) -> String {
    let body = strip_esm(body);
    let mut text = String::new();
    let mut in_paragraph = false;
    let mut skip_depth = 0usize;

    for event in Parser::new(&body) {
        match event {
            Event::Start(Tag::Heading { .. } | Tag::CodeBlock(_) | Tag::HtmlBlock) => {
                skip_depth += 1;
            }
            Event::End(TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::HtmlBlock) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Start(Tag::Paragraph) => in_paragraph = true,
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                text.push(' ');
                if text.chars().count() > max_chars {
                    break;
                }
            }
            Event::Text(t) | Event::Code(t) if in_paragraph && skip_depth == 0 => {
                text.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak if in_paragraph => text.push(' '),
            _ => {}
        }
    }

    truncate_words(&collapse_whitespace(&text), max_chars)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let next_is_space = text.chars().nth(max_chars).is_some_and(char::is_whitespace);
    let kept = if next_is_space {
        cut.as_str()
    } else {
        match cut.rfind(' ') {
            Some(pos) if pos > 0 => &cut[..pos],
            _ => cut.as_str(),
        }
    };

    format!("{}…", kept.trim_end())
}
