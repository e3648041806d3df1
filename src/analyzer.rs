use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::debug;

use crate::beatmap::{
    extract_section, parse_timing_points, read_metadata, scan_last_event, HIT_OBJECTS,
    TIMING_POINTS,
};
use crate::error::{Error, Result};
use crate::models::{
    AnalysisEvent, AnalysisResult, BeatmapReport, BpmSection, Interval, SetResult, TimingRecord,
};

const BEATMAP_EXTENSION: &str = "osu";

/// Check if a path has the beatmap file extension (case-insensitive).
fn is_beatmap_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(BEATMAP_EXTENSION))
        .unwrap_or(false)
}

/// Scan a directory for beatmap files, sorted by filename.
pub fn scan_beatmap_files(path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_beatmap_file(p))
        .collect();
    files.sort();
    files
}

/// Derive tempo regions from the uninherited points of a time-ordered record list.
///
/// Points whose beat length gives no finite tempo (zero, or so small the
/// division overflows) are left out before chaining, so every section ends
/// exactly where the next one starts. The last section is open-ended.
pub fn build_bpm_sections(records: &[TimingRecord]) -> Vec<BpmSection> {
    let tempo_points: Vec<(i64, f64)> = records
        .iter()
        .filter(|r| r.is_uninherited() && r.beat_length_ms != 0.0)
        .map(|r| (r.time_ms, 60_000.0 / r.beat_length_ms))
        .filter(|(_, bpm)| bpm.is_finite())
        .collect();

    tempo_points
        .iter()
        .enumerate()
        .map(|(i, &(start_ms, bpm))| BpmSection {
            start_ms,
            end_ms: tempo_points.get(i + 1).map(|&(next_ms, _)| next_ms),
            bpm,
        })
        .collect()
}

/// Derive raw kiai intervals from the on/off transitions of the kiai bit
/// across every record, inherited or not. A kiai still active after the
/// last record yields an open-ended interval.
pub fn build_kiai_intervals(records: &[TimingRecord]) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut previous: Option<bool> = None;
    let mut open_start: Option<i64> = None;

    for record in records {
        let kiai = record.is_kiai();
        match previous {
            None if kiai => open_start = Some(record.time_ms),
            Some(was_kiai) if was_kiai != kiai => {
                if kiai {
                    open_start = Some(record.time_ms);
                } else if let Some(start) = open_start.take() {
                    intervals.push(Interval::new(start, Some(record.time_ms)));
                }
            }
            _ => {}
        }
        previous = Some(kiai);
    }

    if previous == Some(true) {
        if let Some(start) = open_start {
            intervals.push(Interval::new(start, None));
        }
    }

    intervals
}

/// Coalesce intervals whose gap to the previous one is at most
/// `merge_threshold_ms`. The merged interval takes the later end, which may
/// be open.
///
/// Once the running interval is open-ended, every later interval is dropped
/// without touching it. That mirrors long-standing output and is kept for
/// compatibility even though it looks accidental.
pub fn merge_intervals(intervals: &[Interval], merge_threshold_ms: u32) -> Vec<Interval> {
    let mut iter = intervals.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let threshold = i64::from(merge_threshold_ms);
    let mut merged = Vec::new();
    let mut last = *first;

    for current in iter {
        let Some(last_end) = last.end_ms else {
            continue;
        };
        if current.start_ms.saturating_sub(last_end) <= threshold {
            last.end_ms = current.end_ms;
        } else {
            merged.push(last);
            last = *current;
        }
    }
    merged.push(last);

    merged
}

/// Analyze the full text of a beatmap.
///
/// Reads `[TimingPoints]` for tempo and kiai, and `[HitObjects]` for the
/// last event time, which closes any kiai interval still open at the end.
/// Malformed lines are skipped; an empty text gives an empty result.
pub fn analyze(text: &str, merge_threshold_ms: u32) -> AnalysisResult {
    let timing_lines = extract_section(text, TIMING_POINTS);
    let records = parse_timing_points(&timing_lines);

    let bpm_sections = build_bpm_sections(&records);
    let raw_intervals = build_kiai_intervals(&records);
    let mut kiai_intervals = merge_intervals(&raw_intervals, merge_threshold_ms);

    let last_event_ms = scan_last_event(&extract_section(text, HIT_OBJECTS));

    if let Some(last) = last_event_ms {
        for interval in kiai_intervals.iter_mut().filter(|i| i.end_ms.is_none()) {
            interval.end_ms = Some(last);
        }
    }

    debug!(
        "Analyzed {} timing points: {} BPM sections, {} raw / {} merged kiai intervals, last event {:?}",
        records.len(),
        bpm_sections.len(),
        raw_intervals.len(),
        kiai_intervals.len(),
        last_event_ms,
    );

    AnalysisResult {
        bpm_sections,
        kiai_intervals,
        last_event_ms,
    }
}

/// Analyze beatmap text that did not come from a file on disk (e.g. STDIN).
pub fn analyze_text(text: &str, name: &str, merge_threshold_ms: u32) -> BeatmapReport {
    let title = read_metadata(text)
        .display_title()
        .unwrap_or_else(|| name.to_string());

    BeatmapReport {
        title,
        filename: name.to_string(),
        file_bytes: text.len() as u64,
        analysis: analyze(text, merge_threshold_ms),
    }
}

fn read_beatmap(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| Error::NotUtf8(path.to_path_buf()))
}

/// Analyze a single beatmap file.
pub fn analyze_file(path: &Path, merge_threshold_ms: u32) -> Result<BeatmapReport> {
    let text = read_beatmap(path)?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.clone());

    let mut report = analyze_text(&text, &stem, merge_threshold_ms);
    report.filename = filename;
    Ok(report)
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Analyze all beatmaps in a directory in parallel.
pub fn analyze_directory(path: &Path, jobs: usize, merge_threshold_ms: u32) -> Result<SetResult> {
    let files = scan_beatmap_files(path);
    if files.is_empty() {
        return Err(Error::NoBeatmaps(path.to_path_buf()));
    }

    let jobs = jobs.max(1);
    let files = Arc::new(files);
    let next_index = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..jobs.min(files.len()) {
        let files = Arc::clone(&files);
        let next_index = Arc::clone(&next_index);
        handles.push(std::thread::spawn(move || {
            let mut results = Vec::new();
            loop {
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                if idx >= files.len() {
                    break;
                }
                debug!("Analyzing {}", files[idx].display());
                results.push((idx, analyze_file(&files[idx], merge_threshold_ms)));
            }
            results
        }));
    }

    // Collect results from all threads and sort by original index
    let mut indexed_results: Vec<(usize, Result<BeatmapReport>)> = Vec::new();
    for handle in handles {
        indexed_results.extend(handle.join().map_err(|_| Error::WorkerPanicked)?);
    }
    indexed_results.sort_by_key(|(idx, _)| *idx);

    let mut beatmaps = Vec::with_capacity(indexed_results.len());
    for (_, result) in indexed_results {
        beatmaps.push(result?);
    }

    Ok(SetResult {
        beatmaps,
        set_name: extract_set_name(&files),
        merge_threshold_ms,
    })
}

/// Analyze a directory in parallel, sending progress events through a channel for TUI use.
pub fn analyze_directory_async(
    path: &Path,
    sender: Sender<AnalysisEvent>,
    jobs: usize,
    merge_threshold_ms: u32,
) -> Result<()> {
    let files = scan_beatmap_files(path);
    if files.is_empty() {
        return Err(Error::NoBeatmaps(path.to_path_buf()));
    }

    let jobs = jobs.max(1);
    let files = Arc::new(files);
    let next_index = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..jobs.min(files.len()) {
        let files = Arc::clone(&files);
        let next_index = Arc::clone(&next_index);
        let sender = sender.clone();
        handles.push(std::thread::spawn(move || {
            let mut results = Vec::new();
            loop {
                let index = next_index.fetch_add(1, Ordering::SeqCst);
                if index >= files.len() {
                    break;
                }
                let _ = sender.send(AnalysisEvent::BeatmapStarted { index });
                match analyze_file(&files[index], merge_threshold_ms) {
                    Ok(report) => {
                        let _ = sender.send(AnalysisEvent::BeatmapCompleted {
                            index,
                            report: report.clone(),
                        });
                        results.push((index, report));
                    }
                    Err(e) => {
                        let _ = sender.send(AnalysisEvent::Error {
                            index,
                            message: e.to_string(),
                        });
                    }
                }
            }
            results
        }));
    }

    let mut indexed: Vec<(usize, BeatmapReport)> = Vec::new();
    for handle in handles {
        indexed.extend(handle.join().map_err(|_| Error::WorkerPanicked)?);
    }
    indexed.sort_by_key(|(idx, _)| *idx);

    let _ = sender.send(AnalysisEvent::SetCompleted {
        result: SetResult {
            beatmaps: indexed.into_iter().map(|(_, report)| report).collect(),
            set_name: extract_set_name(&files),
            merge_threshold_ms,
        },
    });

    Ok(())
}

/// "Artist - Title" of the first beatmap that declares both.
fn extract_set_name(files: &[PathBuf]) -> Option<String> {
    files
        .iter()
        .filter_map(|path| read_beatmap(path).ok())
        .find_map(|text| read_metadata(&text).set_name())
}
