use std::path::PathBuf;

use crate::models::{BeatmapReport, SetResult};

#[derive(Debug, Clone)]
pub enum BeatmapStatus {
    Pending,
    Analyzing,
    Complete(BeatmapReport),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Main,
    About,
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportFormat {
    Text,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

pub struct App {
    pub beatmaps: Vec<(String, BeatmapStatus)>,
    pub set_result: Option<SetResult>,
    pub view: View,
    pub selected: usize,
    pub scroll_offset: usize,
    pub should_quit: bool,
    pub set_name: Option<String>,
    pub path: PathBuf,
    pub export_format: ExportFormat,
    pub export_message: Option<String>,
    /// Visible height of the beatmap table (updated each frame by the renderer)
    pub visible_rows: usize,
    pub loaded_from_cache: bool,
    pub merge_threshold_ms: u32,
}

impl App {
    pub fn new(filenames: Vec<String>, path: PathBuf, merge_threshold_ms: u32) -> Self {
        let beatmaps = filenames
            .into_iter()
            .map(|name| (name, BeatmapStatus::Pending))
            .collect();
        Self {
            beatmaps,
            set_result: None,
            view: View::Main,
            selected: 0,
            scroll_offset: 0,
            should_quit: false,
            set_name: None,
            path,
            export_format: ExportFormat::Text,
            export_message: None,
            visible_rows: 20,
            loaded_from_cache: false,
            merge_threshold_ms,
        }
    }

    /// Replace the pending list with a previously saved report.
    pub fn load_from_cache(&mut self, result: SetResult) {
        self.beatmaps = result
            .beatmaps
            .iter()
            .map(|report| {
                (
                    report.filename.clone(),
                    BeatmapStatus::Complete(report.clone()),
                )
            })
            .collect();
        self.selected = 0;
        self.scroll_offset = 0;
        self.set_name = result.set_name.clone();
        self.set_result = Some(result);
        self.loaded_from_cache = true;
    }

    pub fn completed_count(&self) -> usize {
        self.beatmaps
            .iter()
            .filter(|(_, s)| matches!(s, BeatmapStatus::Complete(_)))
            .count()
    }

    pub fn selected_report(&self) -> Option<&BeatmapReport> {
        match self.beatmaps.get(self.selected) {
            Some((_, BeatmapStatus::Complete(report))) => Some(report),
            _ => None,
        }
    }

    pub fn select_next(&mut self) {
        if !self.beatmaps.is_empty() {
            self.selected = (self.selected + 1).min(self.beatmaps.len() - 1);
            self.ensure_visible();
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.ensure_visible();
    }

    /// Adjust scroll_offset so that self.selected is within the visible window.
    fn ensure_visible(&mut self) {
        if self.visible_rows == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = self.selected - self.visible_rows + 1;
        }
    }

    pub fn cycle_export_format(&mut self) {
        self.export_format = match self.export_format {
            ExportFormat::Text => ExportFormat::Json,
            ExportFormat::Json => ExportFormat::Csv,
            ExportFormat::Csv => ExportFormat::Text,
        };
    }

    pub fn export_path(&self) -> PathBuf {
        self.path
            .join(format!("kiai_report.{}", self.export_format.extension()))
    }
}
