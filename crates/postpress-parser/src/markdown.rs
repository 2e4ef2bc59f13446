//! Markdown renderer using pulldown-cmark.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,

    /// Heading text.
    pub text: String,

    /// Anchor ID for linking.
    pub id: String,
}

/// Heading being collected while rendering.
struct OpenHeading {
    level: HeadingLevel,
    explicit_id: Option<String>,
    text: String,
    inner_html: String,
}

/// Image being collected while rendering; its alt text arrives as events.
struct OpenImage {
    src: String,
    title: String,
    alt: String,
}

/// Markdown renderer producing HTML and a table of contents.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: Options,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a new markdown parser with default options.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render a markdown body (no frontmatter) to HTML with TOC extraction.
    pub fn render(&self, content: &str) -> (String, Vec<TocEntry>) {
        let parser = Parser::new_ext(content, self.options);
        let mut toc = Vec::new();
        let mut html = String::new();
        let mut ids = Slugger::default();
        let mut heading: Option<OpenHeading> = None;
        let mut image: Option<OpenImage> = None;
        let mut in_code_block = false;
        let mut in_table_head = false;

        for event in parser {
            if image.is_some() {
                match event {
                    Event::End(TagEnd::Image) => {
                        if let Some(img) = image.take() {
                            let title_attr = if img.title.is_empty() {
                                String::new()
                            } else {
                                format!(" title=\"{}\"", html_escape(&img.title))
                            };
                            push_html(
                                &mut html,
                                &mut heading,
                                &format!(
                                    "<img src=\"{}\" alt=\"{}\"{title_attr} />",
                                    html_escape(&img.src),
                                    html_escape(&img.alt)
                                ),
                            );
                        }
                    }
                    Event::Text(text) | Event::Code(text) => {
                        if let Some(img) = image.as_mut() {
                            img.alt.push_str(&text);
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::Heading { level, id, .. }) => {
                    heading = Some(OpenHeading {
                        level,
                        explicit_id: id.map(|i| i.to_string()),
                        text: String::new(),
                        inner_html: String::new(),
                    });
                }

                Event::End(TagEnd::Heading(_)) => {
                    if let Some(open) = heading.take() {
                        let lvl = open.level as u8;
                        let id = match open.explicit_id {
                            Some(id) => ids.reserve(&id),
                            None => ids.unique(&slugify(&open.text)),
                        };
                        html.push_str(&format!(
                            "<h{lvl} id=\"{}\">{}</h{lvl}>\n",
                            html_escape(&id),
                            open.inner_html
                        ));
                        toc.push(TocEntry {
                            level: lvl,
                            text: open.text.trim().to_string(),
                            id,
                        });
                    }
                }

                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string)
                            .filter(|l| !l.is_empty()),
                        CodeBlockKind::Indented => None,
                    };
                    match lang {
                        Some(lang) => html.push_str(&format!(
                            "<pre><code class=\"language-{}\">",
                            html_escape(&lang)
                        )),
                        None => html.push_str("<pre><code>"),
                    }
                }

                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    html.push_str("</code></pre>\n");
                }

                Event::Text(text) => {
                    if !in_code_block {
                        if let Some(open) = heading.as_mut() {
                            open.text.push_str(&text);
                        }
                    }
                    push_html(&mut html, &mut heading, &html_escape(&text));
                }

                Event::Code(code) => {
                    if let Some(open) = heading.as_mut() {
                        open.text.push_str(&code);
                    }
                    push_html(
                        &mut html,
                        &mut heading,
                        &format!("<code>{}</code>", html_escape(&code)),
                    );
                }

                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    image = Some(OpenImage {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }

                Event::Start(Tag::TableHead) => {
                    in_table_head = true;
                    html.push_str("<thead><tr>");
                }

                Event::End(TagEnd::TableHead) => {
                    in_table_head = false;
                    html.push_str("</tr></thead>\n<tbody>\n");
                }

                Event::Start(Tag::TableCell) => {
                    html.push_str(if in_table_head { "<th>" } else { "<td>" });
                }

                Event::End(TagEnd::TableCell) => {
                    html.push_str(if in_table_head { "</th>" } else { "</td>" });
                }

                Event::SoftBreak => push_html(&mut html, &mut heading, "\n"),

                Event::HardBreak => push_html(&mut html, &mut heading, "<br />\n"),

                Event::Start(tag) => {
                    let open = tag_to_html_start(&tag);
                    push_html(&mut html, &mut heading, &open);
                }

                Event::End(tag) => {
                    let close = tag_to_html_end(&tag);
                    push_html(&mut html, &mut heading, &close);
                }

                Event::Html(raw) | Event::InlineHtml(raw) => {
                    push_html(&mut html, &mut heading, &raw);
                }

                Event::FootnoteReference(name) => {
                    let name = html_escape(&name);
                    html.push_str(&format!(
                        "<sup class=\"footnote-ref\"><a href=\"#fn-{name}\">[{name}]</a></sup>"
                    ));
                }

                Event::Rule => html.push_str("<hr />\n"),

                Event::TaskListMarker(checked) => {
                    html.push_str(if checked {
                        "<input type=\"checkbox\" checked disabled />"
                    } else {
                        "<input type=\"checkbox\" disabled />"
                    });
                }

                Event::InlineMath(math) => {
                    html.push_str(&format!(
                        "<span class=\"math inline\">\\({}\\)</span>",
                        html_escape(&math)
                    ));
                }

                Event::DisplayMath(math) => {
                    html.push_str(&format!(
                        "<div class=\"math display\">\\[{}\\]</div>",
                        html_escape(&math)
                    ));
                }
            }
        }

        (html, toc)
    }
}

/// Append to the open heading if any, otherwise to the document.
fn push_html(html: &mut String, heading: &mut Option<OpenHeading>, fragment: &str) {
    match heading {
        Some(open) => open.inner_html.push_str(fragment),
        None => html.push_str(fragment),
    }
}

/// Convert a pulldown-cmark tag to HTML opening tag.
fn tag_to_html_start(tag: &Tag) -> String {
    match tag {
        Tag::Paragraph => "<p>".to_string(),
        Tag::BlockQuote(_) => "<blockquote>\n".to_string(),
        Tag::List(Some(1)) => "<ol>\n".to_string(),
        Tag::List(Some(start)) => format!("<ol start=\"{start}\">\n"),
        Tag::List(None) => "<ul>\n".to_string(),
        Tag::Item => "<li>".to_string(),
        Tag::FootnoteDefinition(name) => {
            format!("<div class=\"footnote\" id=\"fn-{}\">", html_escape(name))
        }
        Tag::Table(_) => "<table>\n".to_string(),
        Tag::TableRow => "<tr>".to_string(),
        Tag::Emphasis => "<em>".to_string(),
        Tag::Strong => "<strong>".to_string(),
        Tag::Strikethrough => "<del>".to_string(),
        Tag::Link {
            dest_url, title, ..
        } => {
            let title_attr = if title.is_empty() {
                String::new()
            } else {
                format!(" title=\"{}\"", html_escape(title))
            };
            format!("<a href=\"{}\"{title_attr}>", html_escape(dest_url))
        }
        Tag::DefinitionList => "<dl>\n".to_string(),
        Tag::DefinitionListTitle => "<dt>".to_string(),
        Tag::DefinitionListDefinition => "<dd>".to_string(),
        Tag::Superscript => "<sup>".to_string(),
        Tag::Subscript => "<sub>".to_string(),
        // Rendered by the caller or carry no markup of their own.
        Tag::Heading { .. }
        | Tag::CodeBlock(_)
        | Tag::Image { .. }
        | Tag::TableHead
        | Tag::TableCell
        | Tag::HtmlBlock
        | Tag::MetadataBlock(_) => String::new(),
    }
}

/// Convert a pulldown-cmark tag end to HTML closing tag.
fn tag_to_html_end(tag: &TagEnd) -> String {
    match tag {
        TagEnd::Paragraph => "</p>\n".to_string(),
        TagEnd::BlockQuote(_) => "</blockquote>\n".to_string(),
        TagEnd::List(true) => "</ol>\n".to_string(),
        TagEnd::List(false) => "</ul>\n".to_string(),
        TagEnd::Item => "</li>\n".to_string(),
        TagEnd::FootnoteDefinition => "</div>\n".to_string(),
        TagEnd::Table => "</tbody>\n</table>\n".to_string(),
        TagEnd::TableRow => "</tr>\n".to_string(),
        TagEnd::Emphasis => "</em>".to_string(),
        TagEnd::Strong => "</strong>".to_string(),
        TagEnd::Strikethrough => "</del>".to_string(),
        TagEnd::Link => "</a>".to_string(),
        TagEnd::DefinitionList => "</dl>\n".to_string(),
        TagEnd::DefinitionListTitle => "</dt>\n".to_string(),
        TagEnd::DefinitionListDefinition => "</dd>\n".to_string(),
        TagEnd::Superscript => "</sup>".to_string(),
        TagEnd::Subscript => "</sub>".to_string(),
        TagEnd::Heading(_)
        | TagEnd::CodeBlock
        | TagEnd::Image
        | TagEnd::TableHead
        | TagEnd::TableCell
        | TagEnd::HtmlBlock
        | TagEnd::MetadataBlock(_) => String::new(),
    }
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Convert text to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Hands out unique heading ids within one document.
#[derive(Debug, Default)]
struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    /// Reserve `slug`, suffixing `-1`, `-2`, ... on collision.
    fn unique(&mut self, slug: &str) -> String {
        let base = if slug.is_empty() { "section" } else { slug };
        let mut candidate = base.to_string();
        while let Some(count) = self.seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{base}-{}", *count);
        }
        self.seen.insert(candidate.clone(), 0);
        candidate
    }

    /// Reserve an author-supplied id as-is.
    fn reserve(&mut self, id: &str) -> String {
        self.seen.entry(id.to_string()).or_insert(0);
        id.to_string()
    }
}
