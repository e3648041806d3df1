use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::models::SetResult;

const CACHE_FILENAME: &str = "kiai_report.json";
const TEXT_REPORT_FILENAME: &str = "kiai_report.txt";

/// Load a cached set result from `kiai_report.json` in the given directory.
/// Returns `None` if the file is missing, cannot be parsed, or was merged
/// with a different threshold.
pub fn load_cached_report(dir: &Path, merge_threshold_ms: u32) -> Option<SetResult> {
    let path = dir.join(CACHE_FILENAME);
    let data = std::fs::read_to_string(&path).ok()?;
    let result: SetResult = match serde_json::from_str(&data) {
        Ok(result) => result,
        Err(e) => {
            debug!("Ignoring unreadable cache {}: {}", path.display(), e);
            return None;
        }
    };
    if result.merge_threshold_ms != merge_threshold_ms {
        debug!(
            "Ignoring cache {} merged at {} ms (want {} ms)",
            path.display(),
            result.merge_threshold_ms,
            merge_threshold_ms
        );
        return None;
    }
    Some(result)
}

/// Save a set result as pretty-printed JSON to `kiai_report.json` in the given directory.
pub fn save_report(dir: &Path, result: &SetResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(dir.join(CACHE_FILENAME), json)?;
    Ok(())
}

/// Check if all requested report files already exist in the given directory.
/// A JSON report only counts when it was merged with `merge_threshold_ms`.
pub fn reports_exist(dir: &Path, json: bool, txt: bool, merge_threshold_ms: u32) -> bool {
    if json && load_cached_report(dir, merge_threshold_ms).is_none() {
        return false;
    }
    if txt && !dir.join(TEXT_REPORT_FILENAME).exists() {
        return false;
    }
    true
}

/// Save a text report to `kiai_report.txt` in the given directory.
pub fn save_text_report(dir: &Path, content: &str) -> Result<()> {
    std::fs::write(dir.join(TEXT_REPORT_FILENAME), content)?;
    Ok(())
}
