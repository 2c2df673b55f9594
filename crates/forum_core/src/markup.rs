//! Lightweight markdown rendering for cached html bodies.
//!
//! # Responsibility
//! - Turn the markdown source of content and comments into html once, at
//!   write time, so readers never render.
//!
//! # Invariants
//! - All source text is html-escaped before markup is applied.
//! - Link and image targets with a non-web scheme are replaced by `#`.
//! - Rendering is deterministic: equal sources give equal html.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading regex"));
static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+]\s+(.*)$").expect("valid list item regex"));
static QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&gt;\s?(.*)$").expect("valid quote regex"));
static INLINE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"`(?P<code>[^`]*)`",
        r"|!\[(?P<alt>[^\]]*)\]\((?P<src>[^)\s]+)\)",
        r"|\[(?P<label>[^\]]+)\]\((?P<href>[^)\s]+)\)",
    ))
    .expect("valid inline token regex")
});
static STRONG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid strong regex"));
static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s][^*]*)\*").expect("valid emphasis regex"));

const SAFE_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

enum Block {
    Paragraph(Vec<String>),
    List(Vec<String>),
    Quote(Vec<String>),
}

/// Renders markdown source into an html fragment.
///
/// Supported: paragraphs, `#` headings, `-`/`*` lists, `>` quotes, fenced
/// code blocks, inline code, links, images, `**strong**` and `*emphasis*`.
pub fn render_markdown(source: &str) -> String {
    let mut output = Vec::new();
    let mut current: Option<Block> = None;
    let mut lines = source.lines();

    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("```") {
            flush_block(&mut current, &mut output);
            let mut code = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                code.push(inner);
            }
            output.push(format!(
                "<pre><code>{}</code></pre>",
                escape_html(&code.join("\n"))
            ));
            continue;
        }

        let escaped = escape_html(line.trim());
        if escaped.is_empty() {
            flush_block(&mut current, &mut output);
            continue;
        }

        if let Some(caps) = HEADING_RE.captures(&escaped) {
            flush_block(&mut current, &mut output);
            let level = caps[1].len();
            output.push(format!(
                "<h{level}>{}</h{level}>",
                render_inline(caps[2].trim())
            ));
        } else if let Some(caps) = LIST_ITEM_RE.captures(&escaped) {
            push_line(&mut current, &mut output, Block::List(Vec::new()), &caps[1]);
        } else if let Some(caps) = QUOTE_RE.captures(&escaped) {
            push_line(&mut current, &mut output, Block::Quote(Vec::new()), &caps[1]);
        } else {
            push_line(
                &mut current,
                &mut output,
                Block::Paragraph(Vec::new()),
                &escaped,
            );
        }
    }

    flush_block(&mut current, &mut output);
    output.join("\n")
}

/// Escapes the five html-significant characters.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn push_line(current: &mut Option<Block>, output: &mut Vec<String>, fresh: Block, line: &str) {
    let same_kind = matches!(
        (current.as_ref(), &fresh),
        (Some(Block::Paragraph(_)), Block::Paragraph(_))
            | (Some(Block::List(_)), Block::List(_))
            | (Some(Block::Quote(_)), Block::Quote(_))
    );
    if !same_kind {
        flush_block(current, output);
        *current = Some(fresh);
    }

    if let Some(Block::Paragraph(lines) | Block::List(lines) | Block::Quote(lines)) =
        current.as_mut()
    {
        lines.push(line.to_string());
    }
}

fn flush_block(current: &mut Option<Block>, output: &mut Vec<String>) {
    let Some(block) = current.take() else {
        return;
    };

    let html = match block {
        Block::Paragraph(lines) => format!("<p>{}</p>", render_lines(&lines)),
        Block::Quote(lines) => format!("<blockquote><p>{}</p></blockquote>", render_lines(&lines)),
        Block::List(items) => {
            let items = items
                .iter()
                .map(|item| format!("<li>{}</li>", render_inline(item)))
                .collect::<Vec<_>>()
                .join("\n");
            format!("<ul>\n{items}\n</ul>")
        }
    };
    output.push(html);
}

fn render_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| render_inline(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// Input is already escaped. Code spans, images and links are matched in one
// left-to-right pass so emphasis never reaches into their contents.
fn render_inline(text: &str) -> String {
    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;
    for caps in INLINE_TOKEN_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        rendered.push_str(&render_emphasis(&text[last..whole.start()]));
        if let Some(code) = caps.name("code") {
            rendered.push_str("<code>");
            rendered.push_str(code.as_str());
            rendered.push_str("</code>");
        } else if let (Some(alt), Some(src)) = (caps.name("alt"), caps.name("src")) {
            rendered.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">",
                safe_target(src.as_str()),
                alt.as_str()
            ));
        } else if let (Some(label), Some(href)) = (caps.name("label"), caps.name("href")) {
            rendered.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                safe_target(href.as_str()),
                render_inline(label.as_str())
            ));
        }
        last = whole.end();
    }
    rendered.push_str(&render_emphasis(&text[last..]));
    rendered
}

fn render_emphasis(text: &str) -> String {
    let with_strong = STRONG_RE.replace_all(text, "<strong>$1</strong>");
    EMPHASIS_RE
        .replace_all(&with_strong, "<em>$1</em>")
        .into_owned()
}

fn safe_target(target: &str) -> &str {
    let lowered = target.to_ascii_lowercase();
    let has_scheme = lowered
        .split('/')
        .next()
        .is_some_and(|head| head.contains(':'));
    if !has_scheme || SAFE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        target
    } else {
        "#"
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_html, render_markdown};

    #[test]
    fn paragraphs_are_split_on_blank_lines() {
        let html = render_markdown("first line\nsame paragraph\n\nsecond");
        assert_eq!(html, "<p>first line\nsame paragraph</p>\n<p>second</p>");
    }

    #[test]
    fn headings_lists_and_quotes_render_as_blocks() {
        let html = render_markdown("## Title\n- one\n- **two**\n> quoted");
        assert_eq!(
            html,
            "<h2>Title</h2>\n<ul>\n<li>one</li>\n<li><strong>two</strong></li>\n</ul>\n<blockquote><p>quoted</p></blockquote>"
        );
    }

    #[test]
    fn source_html_is_escaped() {
        let html = render_markdown("<script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn fenced_code_is_escaped_and_not_formatted() {
        let html = render_markdown("```\nlet x = a < b && **c**;\n```");
        assert_eq!(
            html,
            "<pre><code>let x = a &lt; b &amp;&amp; **c**;</code></pre>"
        );
    }

    #[test]
    fn inline_code_protects_markup() {
        let html = render_markdown("use `**raw**` here");
        assert_eq!(html, "<p>use <code>**raw**</code> here</p>");
    }

    #[test]
    fn links_and_images_keep_web_targets_only() {
        let html = render_markdown("[go](https://golang.org) ![logo](/img/go.png)");
        assert_eq!(
            html,
            "<p><a href=\"https://golang.org\">go</a> <img src=\"/img/go.png\" alt=\"logo\"></p>"
        );

        let html = render_markdown("[bad](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn emphasis_never_rewrites_link_or_image_attributes() {
        let html = render_markdown("[a](http://x/*y*) and *b*");
        assert_eq!(html, "<p><a href=\"http://x/*y*\">a</a> and <em>b</em></p>");

        let html = render_markdown("![a*b*](https://i/*z*)");
        assert_eq!(html, "<p><img src=\"https://i/*z*\" alt=\"a*b*\"></p>");

        let html = render_markdown("[**bold** label](/t/1)");
        assert_eq!(html, "<p><a href=\"/t/1\"><strong>bold</strong> label</a></p>");
    }

    #[test]
    fn code_spans_work_inside_link_labels() {
        let html = render_markdown("see [`Vec::new`](https://doc.rust-lang.org)");
        assert_eq!(
            html,
            "<p>see <a href=\"https://doc.rust-lang.org\"><code>Vec::new</code></a></p>"
        );

        let html = render_markdown("`[not](a/link)`");
        assert_eq!(html, "<p><code>[not](a/link)</code></p>");
    }

    #[test]
    fn escape_html_covers_quotes() {
        assert_eq!(escape_html(r#"a"b'c"#), "a&quot;b&#39;c");
    }
}
