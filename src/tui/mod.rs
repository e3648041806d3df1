pub mod app;
pub mod ui;

use std::io;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::analyzer::{analyze_directory_async, scan_beatmap_files};
use crate::cache;
use crate::format;
use crate::models::AnalysisEvent;

use app::{App, BeatmapStatus, ExportFormat, View};

pub fn run(path: &Path, jobs: usize, merge_threshold_ms: u32, regenerate: bool) -> Result<()> {
    let files = scan_beatmap_files(path);
    if files.is_empty() {
        anyhow::bail!("No beatmap files found in {}", path.display());
    }

    let filenames: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name().and_then(|f| f.to_str()).map(String::from))
        .collect();

    let mut app = App::new(filenames, path.to_path_buf(), merge_threshold_ms);

    let (tx, rx) = mpsc::channel::<AnalysisEvent>();
    match cache::load_cached_report(path, merge_threshold_ms).filter(|_| !regenerate) {
        Some(cached) => app.load_from_cache(cached),
        None => {
            // Spawn analysis thread
            let analysis_path = path.to_path_buf();
            std::thread::spawn(move || {
                let result =
                    analyze_directory_async(&analysis_path, tx.clone(), jobs, merge_threshold_ms);
                if let Err(e) = result {
                    let _ = tx.send(AnalysisEvent::SetFailed {
                        message: e.to_string(),
                    });
                }
            });
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, rx);

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn apply_event(app: &mut App, event: AnalysisEvent) {
    match event {
        AnalysisEvent::BeatmapStarted { index } => {
            if let Some(beatmap) = app.beatmaps.get_mut(index) {
                beatmap.1 = BeatmapStatus::Analyzing;
            }
        }
        AnalysisEvent::BeatmapCompleted { index, report } => {
            if let Some(beatmap) = app.beatmaps.get_mut(index) {
                beatmap.1 = BeatmapStatus::Complete(report);
            }
        }
        AnalysisEvent::SetCompleted { result } => {
            app.set_name = result.set_name.clone();
            app.set_result = Some(result);
        }
        AnalysisEvent::Error { index, message } => {
            if let Some(beatmap) = app.beatmaps.get_mut(index) {
                beatmap.1 = BeatmapStatus::Error(message);
            }
        }
        AnalysisEvent::SetFailed { message } => {
            // Beatmaps that never finished will not get another event
            for (_, status) in app.beatmaps.iter_mut() {
                if matches!(status, BeatmapStatus::Pending | BeatmapStatus::Analyzing) {
                    *status = BeatmapStatus::Error(message.clone());
                }
            }
        }
    }
}

fn export(app: &mut App) {
    let Some(ref result) = app.set_result else {
        return;
    };
    let content = match app.export_format {
        ExportFormat::Text => format::format_table(result),
        ExportFormat::Json => format::format_json(result),
        ExportFormat::Csv => format::format_csv(result),
    };
    let output_path = app.export_path();
    app.export_message = Some(match std::fs::write(&output_path, &content) {
        Ok(_) => format!("Saved to {}", output_path.display()),
        Err(e) => format!("Error: {}", e),
    });
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: mpsc::Receiver<AnalysisEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        // Note: ui::render updates app.visible_rows each frame

        // Drain analysis events
        while let Ok(event) = rx.try_recv() {
            apply_event(app, event);
        }

        // Poll for key events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.view {
                    View::Main => match key.code {
                        KeyCode::Char('q') => {
                            app.should_quit = true;
                        }
                        KeyCode::Char('e') => {
                            if app.set_result.is_some() {
                                app.view = View::Export;
                                app.export_message = None;
                            }
                        }
                        KeyCode::Char('a') => {
                            app.view = View::About;
                        }
                        KeyCode::Char('j') | KeyCode::Down => {
                            app.select_next();
                        }
                        KeyCode::Char('k') | KeyCode::Up => {
                            app.select_prev();
                        }
                        _ => {}
                    },
                    View::About => {
                        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                            app.view = View::Main;
                        }
                    }
                    View::Export => match key.code {
                        KeyCode::Esc => {
                            app.view = View::Main;
                        }
                        KeyCode::Tab => {
                            app.cycle_export_format();
                            app.export_message = None;
                        }
                        KeyCode::Enter => export(app),
                        _ => {}
                    },
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
