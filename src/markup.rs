//! Sanitizing of task-derived text before it reaches the terminal.
//!
//! Task names, statuses and descriptions come from an upstream system we do not
//! control. Everything shown on screen goes through [`sanitize_text`], which removes
//! control characters (escape sequences included), and descriptions additionally go
//! through [`html_to_text`], which drops markup instead of interpreting it.

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre",
];

/// Strips control characters, keeping newlines and tabs.
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Same as [`sanitize_text`] but also folds newlines and tabs into spaces,
/// for single-line cells.
pub fn sanitize_line(input: &str) -> String {
    sanitize_text(input)
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect()
}

/// Reduces an HTML fragment to plain text.
///
/// Tags are removed; block-level tags become line breaks; `<script>` and `<style>`
/// bodies are dropped; the common named and numeric entities are decoded. Runs of
/// blank lines collapse to one.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut skip_until: Option<&'static str> = None;

    while let Some(start) = rest.find('<') {
        if skip_until.is_none() {
            out.push_str(&decode_entities(&rest[..start]));
        }
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            // Unterminated tag: treat the remainder as text.
            if skip_until.is_none() {
                out.push_str(&decode_entities(&rest[start..]));
            }
            rest = "";
            break;
        };
        let tag = &after[..end];
        rest = &after[end + 1..];

        let (closing, name) = tag_name(tag);
        if let Some(waiting) = skip_until {
            if closing && name == waiting {
                skip_until = None;
            }
            continue;
        }
        match name.as_str() {
            "script" if !closing => skip_until = Some("script"),
            "style" if !closing => skip_until = Some("style"),
            _ if BLOCK_TAGS.contains(&name.as_str()) => {
                if name == "li" {
                    if !closing {
                        out.push_str("\n• ");
                    }
                } else {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
    if skip_until.is_none() {
        out.push_str(&decode_entities(rest));
    }

    collapse_blank_lines(&sanitize_text(&out))
}

fn tag_name(tag: &str) -> (bool, String) {
    let tag = tag.trim();
    let (closing, body) = match tag.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, tag),
    };
    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    (closing, name)
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|semi| *semi <= 10) {
            Some(semi) => match decode_entity(&candidate[1..semi]) {
                Some(decoded) => {
                    out.push(decoded);
                    rest = &candidate[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
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
        "apos" | "#039" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        "laquo" => Some('«'),
        "raquo" => Some('»'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && lines.last().map_or(true, |last| last.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
