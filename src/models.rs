use serde::{Deserialize, Serialize};

/// One parsed line of the `[TimingPoints]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub time_ms: i64,
    /// Positive for tempo-defining points; any other value is kept as declared.
    pub beat_length_ms: f64,
    pub meter: i64,
    pub sample_set: i64,
    pub sample_index: i64,
    pub volume: i64,
    /// Raw uninherited flag as declared in the file.
    pub uninherited: i64,
    /// Effect bitmask; bit 0 is kiai.
    pub effects: i64,
}

impl TimingRecord {
    /// Only a flag of exactly 1 marks a tempo-defining ("red") point.
    pub fn is_uninherited(&self) -> bool {
        self.uninherited == 1
    }

    pub fn is_kiai(&self) -> bool {
        self.effects & 1 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpmSection {
    pub start_ms: i64,
    /// `None` means the section runs to the end of the track.
    pub end_ms: Option<i64>,
    pub bpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start_ms: i64,
    /// `None` means the interval is open-ended.
    pub end_ms: Option<i64>,
}

impl Interval {
    pub fn new(start_ms: i64, end_ms: Option<i64>) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_ms.map(|end| end - self.start_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub bpm_sections: Vec<BpmSection>,
    pub kiai_intervals: Vec<Interval>,
    pub last_event_ms: Option<i64>,
}

impl AnalysisResult {
    /// Lowest and highest BPM across all sections.
    pub fn bpm_range(&self) -> Option<(f64, f64)> {
        let mut bpms = self.bpm_sections.iter().map(|s| s.bpm);
        let first = bpms.next()?;
        Some(bpms.fold((first, first), |(lo, hi), bpm| (lo.min(bpm), hi.max(bpm))))
    }

    /// Total highlighted time. Open-ended intervals have no length and are not counted.
    pub fn kiai_total_ms(&self) -> i64 {
        self.kiai_intervals
            .iter()
            .filter_map(Interval::duration_ms)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatmapReport {
    pub title: String,
    pub filename: String,
    #[serde(default)]
    pub file_bytes: u64,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResult {
    pub beatmaps: Vec<BeatmapReport>,
    pub set_name: Option<String>,
    /// Threshold the kiai intervals were merged with.
    pub merge_threshold_ms: u32,
}

/// Sent from analysis threads to the TUI for live progress
pub enum AnalysisEvent {
    BeatmapStarted { index: usize },
    BeatmapCompleted { index: usize, report: BeatmapReport },
    SetCompleted { result: SetResult },
    Error { index: usize, message: String },
    SetFailed { message: String },
}
