//! Rendered-HTML to lightweight markup conversion.
//!
//! The output is a markdown-flavored plain text: headings keep a `#` prefix,
//! list items a `- ` prefix, anchors become `[text](url)`, and inline code is
//! wrapped in backticks. Link syntax is preserved so the link statistics pass
//! can count occurrences with a plain pattern match. Conversion is
//! deterministic for identical input.

use scraper::{ElementRef, Html, Node};

/// Converts an HTML fragment into markdown-flavored plain text.
pub fn html_to_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.root_element(), &mut out, false);
    tidy(&out)
}

fn render_children(element: ElementRef<'_>, out: &mut String, preserve: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if preserve {
                    out.push_str(text);
                } else {
                    push_collapsed(out, text);
                }
            }
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    render_element(el, out, preserve);
                }
            }
            _ => {}
        }
    }
}

fn render_element(el: ElementRef<'_>, out: &mut String, preserve: bool) {
    let tag = el.value().name();
    if let Some(level) = heading_level(tag) {
        ensure_block(out);
        for _ in 0..level {
            out.push('#');
        }
        out.push(' ');
        render_children(el, out, false);
        ensure_block(out);
        return;
    }

    match tag {
        "script" | "style" | "template" | "noscript" | "svg" | "head" | "iframe" => {}
        "br" => out.push('\n'),
        "hr" => {
            ensure_block(out);
            out.push_str("---");
            ensure_block(out);
        }
        "p" | "div" | "section" | "article" | "blockquote" | "figure" | "table" | "ul" | "ol" => {
            ensure_block(out);
            render_children(el, out, preserve);
            ensure_block(out);
        }
        "li" => {
            ensure_line(out);
            out.push_str("- ");
            render_children(el, out, preserve);
            ensure_line(out);
        }
        "a" => {
            let mut text = String::new();
            render_children(el, &mut text, false);
            let text = text.trim();
            match el.value().attr("href") {
                Some(href) if !text.is_empty() => {
                    out.push('[');
                    out.push_str(text);
                    out.push_str("](");
                    out.push_str(href);
                    out.push(')');
                }
                _ => out.push_str(text),
            }
        }
        "code" => {
            if preserve {
                render_children(el, out, true);
            } else {
                out.push('`');
                render_children(el, out, true);
                out.push('`');
            }
        }
        "pre" => {
            ensure_block(out);
            render_children(el, out, true);
            ensure_block(out);
        }
        "img" => {}
        _ => render_children(el, out, preserve),
    }
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Appends text with whitespace runs collapsed to single spaces.
///
/// A trailing run becomes one space so adjacent inline elements stay
/// separated; block handling trims it again at boundaries.
fn push_collapsed(out: &mut String, text: &str) {
    let mut prev_ends_word = out.chars().last().is_some_and(|c| !c.is_whitespace());
    let mut saw_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            saw_space = true;
        } else {
            if saw_space && prev_ends_word {
                out.push(' ');
            }
            out.push(ch);
            prev_ends_word = true;
            saw_space = false;
        }
    }
    if saw_space && prev_ends_word {
        out.push(' ');
    }
}

fn ensure_block(out: &mut String) {
    trim_trailing_spaces(out);
    if out.is_empty() {
        return;
    }
    while !out.ends_with("\n\n") {
        out.push('\n');
    }
}

fn ensure_line(out: &mut String) {
    trim_trailing_spaces(out);
    if out.is_empty() {
        return;
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
}

fn trim_trailing_spaces(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

/// Collapses runs of blank lines and trims the ends.
fn tidy(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;
    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }
    out
}
