//! WebVTT subtitle parsing.

use super::CaptionSegment;

/// Parse a WebVTT document into caption segments.
///
/// Inline timing and styling tags are dropped. Auto-generated YouTube
/// captions repeat the previous line at the top of each cue; a line identical
/// to the one emitted just before it is skipped.
pub fn parse_vtt(content: &str) -> Vec<CaptionSegment> {
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut last_line = String::new();
    let mut in_header = true;

    for raw in content.lines() {
        let line = raw.trim();

        if line.is_empty() {
            in_header = false;
            current_start = None;
            continue;
        }

        if let Some((start, _)) = line.split_once("-->") {
            in_header = false;
            current_start = parse_timestamp(start.trim());
            continue;
        }

        // Header block, NOTE/STYLE blocks and cue identifiers
        if in_header || current_start.is_none() {
            continue;
        }

        let text = clean_line(line);
        if text.is_empty() || text == last_line {
            continue;
        }

        segments.push(CaptionSegment {
            start_seconds: current_start.unwrap_or_default(),
            text: text.clone(),
        });
        last_line = text;
    }

    segments
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let ts = ts.split_whitespace().next()?;
    let parts: Vec<&str> = ts.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Strip tags, decode common entities and collapse whitespace.
fn clean_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
