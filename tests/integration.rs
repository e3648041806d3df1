use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use kiai::analyzer;
use kiai::cache;
use kiai::format;
use kiai::models::{BpmSection, Interval, SetResult};

/// Write a beatmap with the given metadata, timing point lines, and hit object times.
fn write_beatmap(
    dir: &Path,
    filename: &str,
    title: &str,
    version: &str,
    timing_points: &[&str],
    hit_times: &[i64],
) -> PathBuf {
    let mut text = String::from("osu file format v14\r\n\r\n[General]\r\nAudioFilename: audio.mp3\r\n\r\n");
    text.push_str(&format!(
        "[Metadata]\r\nTitle:{}\r\nArtist:Test Artist\r\nVersion:{}\r\n\r\n",
        title, version
    ));
    text.push_str("[TimingPoints]\r\n");
    for line in timing_points {
        text.push_str(line);
        text.push_str("\r\n");
    }
    text.push_str("\r\n\r\n[HitObjects]\r\n");
    for time in hit_times {
        text.push_str(&format!("256,192,{},1,0,0:0:0:0:\r\n", time));
    }

    let path = dir.join(filename);
    std::fs::write(&path, text).unwrap();
    path
}

/// 120 BPM, kiai 10s-20s and 20.3s-30s (merged at 500ms), last object at 60s.
fn write_standard_beatmap(dir: &Path, filename: &str, version: &str) -> PathBuf {
    write_beatmap(
        dir,
        filename,
        "Kiai Song",
        version,
        &[
            "0,500,4,2,0,60,1,0",
            "10000,-100,4,2,0,70,0,1",
            "20000,-100,4,2,0,60,0,0",
            "20300,-100,4,2,0,70,0,1",
            "30000,-100,4,2,0,60,0,0",
            "40000,400,4,2,0,60,1,0",
        ],
        &[1000, 35000, 60000],
    )
}

/// 120 BPM with two kiai spans 1s apart, last object at 40s.
fn write_split_kiai_beatmap(dir: &Path) -> PathBuf {
    write_beatmap(
        dir,
        "split.osu",
        "Split Song",
        "Normal",
        &[
            "0,500,4,2,0,60,1,0",
            "10000,-100,4,2,0,70,0,1",
            "20000,-100,4,2,0,60,0,0",
            "21000,-100,4,2,0,70,0,1",
            "30000,-100,4,2,0,60,0,0",
        ],
        &[1000, 40000],
    )
}

fn kiai_counts(stdout: &[u8]) -> (u32, Vec<usize>) {
    let result: SetResult = serde_json::from_slice(stdout).unwrap();
    let counts = result
        .beatmaps
        .iter()
        .map(|b| b.analysis.kiai_intervals.len())
        .collect();
    (result.merge_threshold_ms, counts)
}

#[test]
fn test_minimal_red_line() {
    let text = "[TimingPoints]\n0,500,4,0,0,50,1,0\n\n[HitObjects]\n10,10,5000,1,0,0:0:0:0:\n";
    let result = kiai::analyze(text, 500);
    assert_eq!(
        result.bpm_sections,
        vec![BpmSection {
            start_ms: 0,
            end_ms: None,
            bpm: 120.0
        }]
    );
    assert!(result.kiai_intervals.is_empty());
    assert_eq!(result.last_event_ms, Some(5000));
}

#[test]
fn test_open_kiai_without_hit_objects() {
    let result = kiai::analyze("[TimingPoints]\n0,500,4,0,0,50,1,1\n", 500);
    assert_eq!(result.kiai_intervals, vec![Interval::new(0, None)]);
    assert_eq!(result.last_event_ms, None);
}

#[test]
fn test_unrecognized_sections_only() {
    let result = kiai::analyze("[General]\nMode: 0\n[Events]\n0,0,\"bg.jpg\"\n", 500);
    assert!(result.bpm_sections.is_empty());
    assert!(result.kiai_intervals.is_empty());
    assert_eq!(result.last_event_ms, None);
}

#[test]
fn test_merge_threshold_changes_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_standard_beatmap(dir.path(), "map.osu", "Normal");

    let merged = analyzer::analyze_file(&path, 500).unwrap();
    assert_eq!(
        merged.analysis.kiai_intervals,
        vec![Interval::new(10000, Some(30000))]
    );

    let split = analyzer::analyze_file(&path, 299).unwrap();
    assert_eq!(
        split.analysis.kiai_intervals,
        vec![
            Interval::new(10000, Some(20000)),
            Interval::new(20300, Some(30000)),
        ]
    );
}

#[test]
fn test_analyze_file_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_standard_beatmap(dir.path(), "map.osu", "Hard");

    let report = analyzer::analyze_file(&path, 500).unwrap();
    assert_eq!(report.title, "Test Artist - Kiai Song [Hard]");
    assert_eq!(report.filename, "map.osu");
    assert!(report.file_bytes > 0);
    assert_eq!(report.analysis.bpm_sections.len(), 2);
    assert_eq!(report.analysis.bpm_sections[0].end_ms, Some(40000));
    assert_eq!(report.analysis.bpm_sections[1].bpm, 150.0);
    assert_eq!(report.analysis.last_event_ms, Some(60000));
}

#[test]
fn test_analyze_file_not_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.osu");
    std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
    assert!(matches!(
        analyzer::analyze_file(&path, 500),
        Err(kiai::Error::NotUtf8(_))
    ));
}

#[test]
fn test_analyze_directory_order_and_set_name() {
    let dir = tempfile::tempdir().unwrap();
    write_standard_beatmap(dir.path(), "b-hard.osu", "Hard");
    write_standard_beatmap(dir.path(), "a-easy.osu", "Easy");
    std::fs::write(dir.path().join("audio.mp3"), b"not a beatmap").unwrap();

    let result = analyzer::analyze_directory(dir.path(), 2, 500).unwrap();
    assert_eq!(result.beatmaps.len(), 2);
    assert_eq!(result.beatmaps[0].filename, "a-easy.osu");
    assert_eq!(result.beatmaps[1].filename, "b-hard.osu");
    assert_eq!(result.set_name.as_deref(), Some("Test Artist - Kiai Song"));
}

#[test]
fn test_analyze_directory_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        analyzer::analyze_directory(dir.path(), 2, 500),
        Err(kiai::Error::NoBeatmaps(_))
    ));
}

#[test]
fn test_cache_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    write_standard_beatmap(dir.path(), "map.osu", "Normal");
    let result = analyzer::analyze_directory(dir.path(), 1, 500).unwrap();

    cache::save_report(dir.path(), &result).unwrap();
    let loaded = cache::load_cached_report(dir.path(), 500).unwrap();
    assert_eq!(loaded.beatmaps.len(), 1);
    assert_eq!(loaded.beatmaps[0].analysis, result.beatmaps[0].analysis);
}

#[test]
fn test_table_formatter() {
    let dir = tempfile::tempdir().unwrap();
    write_standard_beatmap(dir.path(), "map.osu", "Normal");
    let result = analyzer::analyze_directory(dir.path(), 1, 500).unwrap();

    let table = format::format_table(&result);
    assert!(table.contains("120.00-150.00"));
    assert!(table.contains("0:20.000"));
    assert!(table.contains("1:00.000"));
    assert!(table.contains("Number of beatmaps: 1"));
}

// --- CLI tests ---

#[test]
fn test_cli_single_file_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_standard_beatmap(dir.path(), "map.osu", "Normal");

    cargo_bin_cmd!("kiai")
        .arg(path.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicates::str::contains("Test Artist - Kiai Song [Normal]"))
        .stdout(predicates::str::contains("0:10.000"))
        .stdout(predicates::str::contains("Last event: 1:00.000"));
}

#[test]
fn test_cli_merge_threshold_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_standard_beatmap(dir.path(), "map.osu", "Normal");

    let output = cargo_bin_cmd!("kiai")
        .args([path.to_str().unwrap(), "--json", "--merge-threshold", "100"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: kiai::models::BeatmapReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report.analysis.kiai_intervals.len(), 2);
}

#[test]
fn test_cli_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_standard_beatmap(dir.path(), "map.osu", "Normal");
    let config = dir.path().join("kiai.toml");
    std::fs::write(&config, "merge_threshold_ms = 0\n").unwrap();

    let output = cargo_bin_cmd!("kiai")
        .args([path.to_str().unwrap(), "--json", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: kiai::models::BeatmapReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report.analysis.kiai_intervals.len(), 2);
}

#[test]
fn test_cli_stdin() {
    cargo_bin_cmd!("kiai")
        .args(["-", "--json"])
        .write_stdin("[TimingPoints]\n0,500,4,0,0,50,1,1\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("\"bpm\": 120.0"))
        .stdout(predicates::str::contains("\"last_event_ms\": null"));
}

#[test]
fn test_cli_directory_saves_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_standard_beatmap(dir.path(), "map.osu", "Normal");

    cargo_bin_cmd!("kiai")
        .args([dir.path().to_str().unwrap(), "--txt"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Number of beatmaps: 1"));

    assert!(dir.path().join("kiai_report.json").exists());
    let txt = std::fs::read_to_string(dir.path().join("kiai_report.txt")).unwrap();
    assert!(txt.contains("Number of beatmaps"));

    // Second run is served from the cache
    cargo_bin_cmd!("kiai")
        .arg(dir.path().to_str().unwrap())
        .assert()
        .success()
        .stderr(predicates::str::contains("Loaded from cached report"));
}

#[test]
fn test_cli_cache_ignored_after_threshold_change() {
    let dir = tempfile::tempdir().unwrap();
    write_split_kiai_beatmap(dir.path());

    let first = cargo_bin_cmd!("kiai")
        .args([dir.path().to_str().unwrap(), "--json"])
        .assert()
        .success();
    assert_eq!(kiai_counts(&first.get_output().stdout), (500, vec![2]));

    // Same directory, wider threshold, no --regenerate
    let second = cargo_bin_cmd!("kiai")
        .args([dir.path().to_str().unwrap(), "--json", "--merge-threshold", "2000"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Loaded from cached report").not());
    assert_eq!(kiai_counts(&second.get_output().stdout), (2000, vec![1]));

    // The rewritten cache now serves the new threshold
    let third = cargo_bin_cmd!("kiai")
        .args([dir.path().to_str().unwrap(), "--json", "--merge-threshold", "2000"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Loaded from cached report"));
    assert_eq!(kiai_counts(&third.get_output().stdout), (2000, vec![1]));
}

#[test]
fn test_cli_csv() {
    let dir = tempfile::tempdir().unwrap();
    write_standard_beatmap(dir.path(), "map.osu", "Normal");

    cargo_bin_cmd!("kiai")
        .args([dir.path().to_str().unwrap(), "--csv", "--regenerate"])
        .assert()
        .success()
        .stdout(predicates::str::starts_with("BPM min,BPM max"))
        .stdout(predicates::str::contains("120.00,150.00,1,20000,60000,map.osu"));
}

#[test]
fn test_cli_json_and_csv_conflict() {
    cargo_bin_cmd!("kiai")
        .args([".", "--json", "--csv"])
        .assert()
        .failure();
}

#[test]
fn test_cli_missing_path() {
    cargo_bin_cmd!("kiai")
        .arg("/definitely/not/here.osu")
        .assert()
        .failure()
        .stderr(predicates::str::contains("is not a file or directory"));
}

#[test]
fn test_cli_directory_without_beatmaps() {
    let dir = tempfile::tempdir().unwrap();

    cargo_bin_cmd!("kiai")
        .arg(dir.path().to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicates::str::contains("No beatmap files found"));
}

// --- Bulk mode tests ---

fn setup_bulk_dir() -> tempfile::TempDir {
    let base = tempfile::tempdir().unwrap();

    let set_a = base.path().join("Set A");
    let set_b = base.path().join("Set B");
    std::fs::create_dir(&set_a).unwrap();
    std::fs::create_dir(&set_b).unwrap();

    write_standard_beatmap(&set_a, "a.osu", "Easy");
    write_standard_beatmap(&set_b, "b.osu", "Hard");

    base
}

#[test]
fn test_bulk_json_only() {
    let base = setup_bulk_dir();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .success();

    assert!(base.path().join("Set A/kiai_report.json").exists());
    assert!(base.path().join("Set B/kiai_report.json").exists());
    assert!(!base.path().join("Set A/kiai_report.txt").exists());

    let json_a = std::fs::read_to_string(base.path().join("Set A/kiai_report.json")).unwrap();
    let parsed: SetResult = serde_json::from_str(&json_a).unwrap();
    assert_eq!(parsed.beatmaps.len(), 1);
}

#[test]
fn test_bulk_requires_output_format() {
    let base = setup_bulk_dir();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("--bulk requires at least one output format"));
}

#[test]
fn test_bulk_skips_existing_reports() {
    let base = setup_bulk_dir();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json", "--txt"])
        .assert()
        .success();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json", "--txt"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Skipping"))
        .stderr(predicates::str::contains(
            "Done: 0 analyzed, 2 skipped, 0 failed (out of 2 total)",
        ));
}

#[test]
fn test_bulk_regenerate() {
    let base = setup_bulk_dir();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .success();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json", "--regenerate"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Analyzing"))
        .stderr(predicates::str::contains(
            "Done: 2 analyzed, 0 skipped, 0 failed (out of 2 total)",
        ));
}

#[test]
fn test_bulk_reanalyzes_after_threshold_change() {
    let base = setup_bulk_dir();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .success();

    cargo_bin_cmd!("kiai")
        .args([
            base.path().to_str().unwrap(),
            "--bulk",
            "--json",
            "--merge-threshold",
            "100",
        ])
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "Done: 2 analyzed, 0 skipped, 0 failed (out of 2 total)",
        ));

    let json_a = std::fs::read_to_string(base.path().join("Set A/kiai_report.json")).unwrap();
    let parsed: SetResult = serde_json::from_str(&json_a).unwrap();
    assert_eq!(parsed.merge_threshold_ms, 100);
    // The 300ms gap no longer merges
    assert_eq!(parsed.beatmaps[0].analysis.kiai_intervals.len(), 2);
}

#[test]
fn test_bulk_counts_failed_sets() {
    let base = setup_bulk_dir();
    std::fs::create_dir(base.path().join("Set C")).unwrap();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "Done: 2 analyzed, 0 skipped, 1 failed (out of 3 total)",
        ));
}

#[test]
fn test_bulk_no_subdirectories() {
    let base = tempfile::tempdir().unwrap();
    std::fs::write(base.path().join("file.txt"), "not a dir").unwrap();

    cargo_bin_cmd!("kiai")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No subdirectories found"));
}
