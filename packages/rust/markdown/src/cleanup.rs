//! Cleanup pipeline for model-written Markdown fragments.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Fragments are embedded under fixed report headings, so the passes make
//! sure a fragment can never open a heading of its own.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on a narrative fragment.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = strip_wrapping_fence(&result);
    result = demote_headings(&result);
    result = strip_leftover_html(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = close_open_fence(result.trim());

    result
}

/// Clean a single list item: run the pipeline, drop any bullet marker the
/// model already added, and indent continuation lines under the bullet.
pub(crate) fn clean_list_item(item: &str) -> String {
    static BULLET_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(?:[-*+]|\d+[.)])\s+").expect("valid regex"));

    let cleaned = run_pipeline(item);
    let cleaned = BULLET_RE.replace(&cleaned, "").to_string();

    cleaned
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape characters that would break a `[title](url)` link.
pub(crate) fn escape_link_text(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    single_line.replace('[', "\\[").replace(']', "\\]")
}

// ---------------------------------------------------------------------------
// Pass 1: Strip a fence wrapping the whole fragment
// ---------------------------------------------------------------------------

/// Models sometimes wrap the whole answer in ```markdown ... ```.
fn strip_wrapping_fence(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A\s*```[A-Za-z]*\s*\n(.*?)\n\s*```\s*\z").expect("valid regex")
    });

    match FENCE_RE.captures(md) {
        Some(caps) => caps[1].to_string(),
        None => md.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Pass 2: Demote headings
// ---------------------------------------------------------------------------

/// Turn every ATX heading into bold text.
fn demote_headings(md: &str) -> String {
    static H_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$").expect("valid regex")
    });

    let mut in_code_block = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                return line.to_string();
            }
            match H_RE.captures(line) {
                Some(caps) => format!("**{}**", &caps[1]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove block-level HTML tags (keeping their text) outside code blocks.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|p|section|article|aside|header|footer|h[1-6]|details|summary|style|script)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut in_code_block = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                return line.to_string();
            }
            if in_code_block {
                line.to_string()
            } else {
                HTML_TAG_RE.replace_all(line, "").to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 4: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace and normalize CRLF line endings.
fn normalize_whitespace(md: &str) -> String {
    md.replace("\r\n", "\n")
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single blank line.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Close an unterminated code fence
// ---------------------------------------------------------------------------

/// Append a closing fence if the fragment leaves one open, so the report's
/// own headings that follow are never swallowed into a code block.
fn close_open_fence(md: &str) -> String {
    let mut open: Option<String> = None;

    for line in md.lines() {
        let trimmed = line.trim_start();
        let Some(marker) = fence_marker(trimmed) else {
            continue;
        };
        match &open {
            None => open = Some(marker.to_string()),
            Some(opener) => {
                let closes = marker.starts_with(opener.as_str())
                    && trimmed[marker.len()..].trim().is_empty();
                if closes {
                    open = None;
                }
            }
        }
    }

    match open {
        Some(opener) => format!("{md}\n{opener}"),
        None => md.to_string(),
    }
}

/// Leading run of three or more backticks or tildes.
fn fence_marker(line: &str) -> Option<&str> {
    let first = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|c| *c == first).count();
    (len >= 3).then_some(&line[..len])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
