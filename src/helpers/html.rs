//! HTML helper functions

use crate::content::{FragmentKind, Span, SpanKind, TextFragment};

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render rich-text fragments to HTML
///
/// Consecutive list items are grouped into one `<ul>` / `<ol>`.
pub fn render_fragments(fragments: &[TextFragment]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for fragment in fragments {
        let list = match fragment.kind {
            FragmentKind::ListItem => Some("ul"),
            FragmentKind::OrderedListItem => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        let inner = render_spans(&fragment.text, &fragment.spans);
        match fragment.kind {
            FragmentKind::Paragraph => html.push_str(&format!("<p>{}</p>", inner)),
            FragmentKind::Heading(level) => {
                let level = level.clamp(1, 6);
                html.push_str(&format!("<h{level}>{inner}</h{level}>"));
            }
            FragmentKind::ListItem | FragmentKind::OrderedListItem => {
                html.push_str(&format!("<li>{}</li>", inner))
            }
            FragmentKind::Preformatted => html.push_str(&format!("<pre>{}</pre>", inner)),
        }
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

/// Escape `text` and wrap span ranges in their tags
///
/// Text is cut at every span boundary and each piece is wrapped in all
/// spans covering it, so overlapping spans still produce balanced markup.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();

    let mut bounds: Vec<usize> = vec![0, chars.len()];
    for span in spans {
        bounds.push(span.start.min(chars.len()));
        bounds.push(span.end.min(chars.len()));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut html = String::new();
    for window in bounds.windows(2) {
        let (start, end) = (window[0], window[1]);
        let piece: String = chars[start..end].iter().collect();
        let covering: Vec<&Span> = spans
            .iter()
            .filter(|s| s.start <= start && end <= s.end)
            .collect();

        for span in &covering {
            html.push_str(&open_tag(&span.kind));
        }
        html.push_str(&html_escape(&piece).replace('\n', "<br />"));
        for span in covering.iter().rev() {
            html.push_str(close_tag(&span.kind));
        }
    }

    html
}

fn open_tag(kind: &SpanKind) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink { url } if is_safe_url(url) => format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">"#,
            html_escape(url)
        ),
        SpanKind::Hyperlink { .. } => "<span>".to_string(),
        SpanKind::Label { name } => format!(r#"<span class="{}">"#, html_escape(name)),
    }
}

fn close_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink { url } if is_safe_url(url) => "</a>",
        SpanKind::Hyperlink { .. } | SpanKind::Label { .. } => "</span>",
    }
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    ["http://", "https://", "mailto:", "/", "#"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}
