//! Documentation header extraction
//!
//! Reads the first structured comment block of an entry file as text. The
//! tool is never imported or executed. Recognised blocks:
//! - a triple-quoted docstring (`"""` or `'''`)
//! - a run of `#` comment lines
//! - a run of `//` comment lines
//!
//! A shebang and an encoding line may precede the block.

/// First non-empty line of the leading documentation block, or empty
pub fn extract_description(content: &str) -> String {
    let mut lines = content.lines().peekable();

    if lines.peek().is_some_and(|l| l.starts_with("#!")) {
        lines.next();
    }
    while lines.peek().is_some_and(|l| l.trim().is_empty() || is_pragma(l.trim())) {
        lines.next();
    }

    let Some(first) = lines.next() else {
        return String::new();
    };
    let first = first.trim();

    for quote in ["\"\"\"", "'''"] {
        let opener = first.trim_start_matches(['r', 'R', 'u', 'U']);
        if let Some(after) = opener.strip_prefix(quote) {
            return docstring(after, quote, &mut lines);
        }
    }

    for marker in ["//", "#"] {
        if first.starts_with(marker) {
            let block = std::iter::once(first)
                .chain(lines.map(str::trim).take_while(|l| l.starts_with(marker)))
                .map(|l| strip_comment_marker(l, marker));
            return first_meaningful(block);
        }
    }

    String::new()
}

fn docstring<'a>(after_open: &'a str, quote: &str, rest: &mut impl Iterator<Item = &'a str>) -> String {
    if let Some(end) = after_open.find(quote) {
        return after_open[..end].trim().to_string();
    }

    let mut block = vec![after_open.trim()];
    for line in rest {
        let line = line.trim();
        if let Some(end) = line.find(quote) {
            block.push(line[..end].trim());
            break;
        }
        block.push(line);
    }
    first_meaningful(block.into_iter())
}

fn strip_comment_marker<'a>(line: &'a str, marker: &str) -> &'a str {
    let body = line.trim_start_matches(marker);
    // rustdoc style `//!` and `///`
    let body = if marker == "//" { body.trim_start_matches(['!', '/']) } else { body };
    body.trim()
}

fn first_meaningful<'a>(mut block: impl Iterator<Item = &'a str>) -> String {
    block
        .find(|l| !l.is_empty() && !l.chars().all(|c| matches!(c, '-' | '=' | '*' | '#')))
        .unwrap_or_default()
        .to_string()
}

fn is_pragma(line: &str) -> bool {
    line.starts_with('#') && (line.contains("coding:") || line.contains("coding=") || line.starts_with("# vim:"))
}
