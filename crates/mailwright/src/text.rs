//! Plain-text extraction from HTML bodies.
//!
//! A message with an HTML body and no text body gets its text alternative
//! from a [`TextExtractor`]. Extraction is best effort and never fails.

use htmd::HtmlToMarkdown;

/// Elements whose content never belongs in the text rendering.
const SKIPPED_TAGS: &[&str] = &["script", "style", "head"];

/// Elements that end a line of text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "td",
    "th", "tr", "ul",
];

/// Derives a plain-text rendering from an HTML document.
pub trait TextExtractor {
    /// Extracts readable text from `html`.
    ///
    /// Malformed markup degrades to partial text instead of failing.
    fn extract_text(&self, html: &str) -> String;
}

/// Default extractor backed by `htmd`.
///
/// Heading markers and strong-emphasis delimiters are removed from the
/// converted text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextExtractor;

impl TextExtractor for HtmlTextExtractor {
    fn extract_text(&self, html: &str) -> String {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(SKIPPED_TAGS.to_vec())
            .build();

        match converter.convert(html) {
            Ok(text) => collapse_blank_lines(&strip_markers(&text)),
            Err(e) => {
                tracing::debug!(error = %e, "HTML conversion failed, stripping tags instead");
                TagStripExtractor.extract_text(html)
            }
        }
    }
}

/// Minimal extractor that drops tags and decodes common entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagStripExtractor;

impl TextExtractor for TagStripExtractor {
    fn extract_text(&self, html: &str) -> String {
        collapse_blank_lines(&strip_tags(html))
    }
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut skipping: Option<String> = None;

    while let Some(start) = rest.find('<') {
        if skipping.is_none() {
            out.push_str(&decode_entities(&rest[..start]));
        }
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            rest = "";
            break;
        };

        let tag = &after[..end];
        let closing = tag.starts_with('/');
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();

        match &skipping {
            Some(skipped) if closing && *skipped == name => skipping = None,
            Some(_) => {}
            None if !closing && SKIPPED_TAGS.contains(&name.as_str()) => skipping = Some(name),
            None if BLOCK_TAGS.contains(&name.as_str()) => out.push('\n'),
            None => {}
        }

        rest = &after[end + 1..];
    }

    if skipping.is_none() {
        out.push_str(&decode_entities(rest));
    }
    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let decoded = candidate
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Drops ATX heading prefixes and `**` / `__` delimiters.
fn strip_markers(text: &str) -> String {
    text.lines()
        .map(|line| {
            let hashes = line.len() - line.trim_start_matches('#').len();
            let line = match line[hashes..].strip_prefix(' ') {
                Some(rest) if (1..=6).contains(&hashes) => rest,
                _ => line,
            };
            line.replace("**", "").replace("__", "")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trims trailing whitespace and squeezes runs of blank lines into one.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = 0;
    }

    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_html_extractor_keeps_text() {
        let text = HtmlTextExtractor.extract_text("<h1>Welcome</h1><p>Hello <b>World</b></p>");
        assert!(text.contains("Welcome"));
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains('<'));
        assert!(text.starts_with("Welcome"));
        assert!(text.contains("Hello World"));
        assert!(!text.contains("**"));
        assert!(!text.contains('#'));
    }

    #[test]
    fn test_strip_markers() {
        assert_eq!(
            strip_markers("# Title\n\n### Sub\nSome **bold** and __strong__\n#hashtag\n####### seven"),
            "Title\n\nSub\nSome bold and strong\n#hashtag\n####### seven"
        );
    }

    #[test]
    fn test_html_extractor_skips_scripts_and_styles() {
        let html = "<html><head><title>T</title><style>p{color:red}</style></head>\
                    <body><script>alert('x')</script><p>Visible</p></body></html>";
        let text = HtmlTextExtractor.extract_text(html);
        assert!(text.contains("Visible"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_html_extractor_decodes_entities() {
        let text = HtmlTextExtractor.extract_text("<p>caf&eacute; &#233;t&#xE9;</p>");
        assert!(text.contains("café été"));
    }

    #[test]
    fn test_strip_tags() {
        let text = TagStripExtractor.extract_text(
            "<div>One</div>\n\n\n<p>Two &amp; <i>three</i></p><script>x()</script>",
        );
        assert_eq!(text, "One\n\nTwo & three");
    }

    #[test]
    fn test_strip_tags_malformed() {
        assert_eq!(TagStripExtractor.extract_text("a <b>bold"), "a bold");
        assert_eq!(TagStripExtractor.extract_text("a < b"), "a");
        assert_eq!(TagStripExtractor.extract_text("fish &chips; 5 &lt 6"), "fish &chips; 5 &lt 6");
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("&#xFFFFFFFF;"), "&#xFFFFFFFF;");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("\n\na  \n\n\n\nb\nc\n\n"), "a\n\nb\nc");
        assert_eq!(collapse_blank_lines(""), "");
    }

    proptest! {
        #[test]
        fn prop_extraction_never_panics(html in "[<>/a-z &;#0-9\n]{0,200}") {
            let stripped = TagStripExtractor.extract_text(&html);
            prop_assert!(!stripped.contains("\n\n\n"));
            let _ = HtmlTextExtractor.extract_text(&html);
        }
    }
}
