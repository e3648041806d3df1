use tracing::trace;

use crate::models::TimingRecord;

pub const TIMING_POINTS: &str = "TimingPoints";
pub const HIT_OBJECTS: &str = "HitObjects";
pub const METADATA: &str = "Metadata";

/// Minimum number of comma-separated fields in a timing point line.
const TIMING_FIELDS: usize = 8;

/// Check if a trimmed line is a `[Section]` header.
fn is_header(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(']')
}

/// Collect the lines of the first `[name]` section, trimmed, with blank
/// lines and `//` comments removed. A missing section yields no lines.
pub fn extract_section<'a>(text: &'a str, name: &str) -> Vec<&'a str> {
    let header = format!("[{}]", name);
    let text = text.trim_start_matches('\u{feff}');

    let mut lines = Vec::new();
    let mut in_section = false;

    for line in text.lines().map(str::trim) {
        if is_header(line) {
            if in_section {
                break;
            }
            in_section = line == header;
            continue;
        }
        if in_section && !line.is_empty() && !line.starts_with("//") {
            lines.push(line);
        }
    }

    lines
}

/// Parse an integer field. Surrounding whitespace is ignored and decimal or
/// scientific notation is truncated toward zero.
pub fn parse_int(field: &str) -> Option<i64> {
    let field = field.trim();
    if let Ok(value) = field.parse::<i64>() {
        return Some(value);
    }
    parse_float(field).map(|value| value.trunc() as i64)
}

/// Parse an integer field, falling back to `default` when it is malformed.
pub fn parse_int_or(field: &str, default: i64) -> i64 {
    parse_int(field).unwrap_or(default)
}

/// Parse a finite floating-point field.
pub fn parse_float(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a single timing point line. Returns `None` when the line is
/// truncated or its time or beat length is unusable; the remaining
/// fields default to 0 individually.
pub fn parse_timing_line(line: &str) -> Option<TimingRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < TIMING_FIELDS {
        return None;
    }

    let time_ms = parse_int(fields[0])?;
    let beat_length_ms = parse_float(fields[1])?;

    Some(TimingRecord {
        time_ms,
        beat_length_ms,
        meter: parse_int_or(fields[2], 0),
        sample_set: parse_int_or(fields[3], 0),
        sample_index: parse_int_or(fields[4], 0),
        volume: parse_int_or(fields[5], 0),
        uninherited: parse_int_or(fields[6], 0),
        effects: parse_int_or(fields[7], 0),
    })
}

/// Parse the `[TimingPoints]` lines into records ordered by time.
/// Records sharing a timestamp keep their file order.
pub fn parse_timing_points(lines: &[&str]) -> Vec<TimingRecord> {
    let mut records: Vec<TimingRecord> = lines
        .iter()
        .filter_map(|line| {
            let record = parse_timing_line(line);
            if record.is_none() {
                trace!("Dropping malformed timing point: {:?}", line);
            }
            record
        })
        .collect();

    // sort_by_key is stable
    records.sort_by_key(|r| r.time_ms);
    records
}

/// Latest hit object time in the `[HitObjects]` lines, or `None` when no
/// line carries a usable time. The running maximum starts at 0.
pub fn scan_last_event(lines: &[&str]) -> Option<i64> {
    let mut last: Option<i64> = None;

    for line in lines {
        let Some(time) = line.split(',').nth(2).and_then(parse_int) else {
            trace!("Dropping malformed hit object: {:?}", line);
            continue;
        };
        last = Some(last.unwrap_or(0).max(time));
    }

    last
}

/// Display fields from the `[Metadata]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub version: Option<String>,
}

impl Metadata {
    /// "Artist - Title", when both are declared.
    pub fn set_name(&self) -> Option<String> {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => Some(format!("{} - {}", artist, title)),
            _ => None,
        }
    }

    /// "Artist - Title [Version]", degrading gracefully when parts are missing.
    pub fn display_title(&self) -> Option<String> {
        let base = self.set_name().or_else(|| self.title.clone())?;
        Some(match &self.version {
            Some(version) => format!("{} [{}]", base, version),
            None => base,
        })
    }
}

pub fn read_metadata(text: &str) -> Metadata {
    let mut metadata = Metadata::default();

    for line in extract_section(text, METADATA) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "Title" => metadata.title = Some(value.to_string()),
            "Artist" => metadata.artist = Some(value.to_string()),
            "Version" => metadata.version = Some(value.to_string()),
            _ => {}
        }
    }

    metadata
}
