use crate::models::{AnalysisResult, BeatmapReport, Interval, SetResult};

/// Format a millisecond count as "M:SS.mmm". Negative input is clamped to 0.
pub fn ms_to_time_string(ms: i64) -> String {
    let ms = ms.max(0);
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

/// Format an optional end time; an absent end runs to the end of the track.
fn format_end(end_ms: Option<i64>) -> String {
    end_ms
        .map(ms_to_time_string)
        .unwrap_or_else(|| "end".to_string())
}

fn format_bpm_range(analysis: &AnalysisResult) -> String {
    match analysis.bpm_range() {
        Some((lo, hi)) if (hi - lo).abs() < 0.005 => format!("{:.2}", lo),
        Some((lo, hi)) => format!("{:.2}-{:.2}", lo, hi),
        None => "--".to_string(),
    }
}

fn format_length(analysis: &AnalysisResult) -> String {
    analysis
        .last_event_ms
        .map(ms_to_time_string)
        .unwrap_or_else(|| "--".to_string())
}

fn format_interval_length(interval: &Interval) -> String {
    interval
        .duration_ms()
        .map(ms_to_time_string)
        .unwrap_or_else(|| "open".to_string())
}

/// Format a single beatmap's BPM sections and kiai intervals.
pub fn format_table_single(report: &BeatmapReport) -> String {
    let separator = "\u{2500}".repeat(44);
    let analysis = &report.analysis;
    let mut output = String::new();

    output.push_str(&format!("{}\n{}\n", report.title, separator));

    output.push_str(&format!("{:<12} {:<12} {:>10}\n", "Start", "End", "BPM"));
    for section in &analysis.bpm_sections {
        output.push_str(&format!(
            "{:<12} {:<12} {:>10.2}\n",
            ms_to_time_string(section.start_ms),
            format_end(section.end_ms),
            section.bpm,
        ));
    }
    if analysis.bpm_sections.is_empty() {
        output.push_str("(no BPM sections)\n");
    }
    output.push_str(&separator);
    output.push('\n');

    output.push_str(&format!("{:<12} {:<12} {:>10}\n", "Kiai start", "End", "Length"));
    for interval in &analysis.kiai_intervals {
        output.push_str(&format!(
            "{:<12} {:<12} {:>10}\n",
            ms_to_time_string(interval.start_ms),
            format_end(interval.end_ms),
            format_interval_length(interval),
        ));
    }
    if analysis.kiai_intervals.is_empty() {
        output.push_str("(no kiai time)\n");
    }
    output.push_str(&separator);
    output.push('\n');

    output.push_str(&format!("Last event: {}", format_length(analysis)));
    output
}

/// Format a beatmap set as a table with one row per difficulty.
pub fn format_table(result: &SetResult) -> String {
    let separator = "\u{2500}".repeat(72);
    let mut output = String::new();

    if let Some(ref name) = result.set_name {
        output.push_str(&format!("Set: {}\n", name));
    }

    output.push_str(&format!(
        "{:<15} {:>5} {:>10} {:>10}  {}\n",
        "BPM", "Kiai", "Kiai time", "Length", "Beatmap"
    ));
    output.push_str(&separator);
    output.push('\n');

    for beatmap in &result.beatmaps {
        let analysis = &beatmap.analysis;
        output.push_str(&format!(
            "{:<15} {:>5} {:>10} {:>10}  {}\n",
            format_bpm_range(analysis),
            analysis.kiai_intervals.len(),
            ms_to_time_string(analysis.kiai_total_ms()),
            format_length(analysis),
            beatmap.title,
        ));
    }

    output.push_str(&separator);
    output.push('\n');

    output.push_str(&format!("Number of beatmaps: {}", result.beatmaps.len()));

    output
}

/// Format a single beatmap report as pretty-printed JSON.
pub fn format_json_single(report: &BeatmapReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Format a beatmap set as pretty-printed JSON.
pub fn format_json(result: &SetResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}

/// Format a beatmap set as CSV.
pub fn format_csv(result: &SetResult) -> String {
    let mut output = String::from("BPM min,BPM max,Kiai count,Kiai ms,Last event ms,File,Beatmap\n");
    for beatmap in &result.beatmaps {
        let analysis = &beatmap.analysis;
        let (lo, hi) = match analysis.bpm_range() {
            Some((lo, hi)) => (format!("{:.2}", lo), format!("{:.2}", hi)),
            None => (String::new(), String::new()),
        };
        output.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            lo,
            hi,
            analysis.kiai_intervals.len(),
            analysis.kiai_total_ms(),
            analysis
                .last_event_ms
                .map(|ms| ms.to_string())
                .unwrap_or_default(),
            csv_field(&beatmap.filename),
            csv_field(&beatmap.title),
        ));
    }
    output
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
