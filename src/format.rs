//! Format status results as text tables or JSON.

use crate::status::StatusValue;
use crate::types::StatusResult;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Status name colored by severity
pub fn format_status(status: StatusValue, color: bool) -> String {
    let name = status.as_str();
    if !color {
        return name.to_string();
    }
    match status {
        StatusValue::Normal => name.green().to_string(),
        StatusValue::Added | StatusValue::Modified | StatusValue::Deleted | StatusValue::Replaced => {
            name.yellow().to_string()
        }
        StatusValue::Conflicted | StatusValue::Obstructed | StatusValue::Error => {
            name.red().bold().to_string()
        }
        StatusValue::Missing => name.red().to_string(),
        StatusValue::Calculating | StatusValue::Unknown => name.dimmed().to_string(),
        _ => name.cyan().to_string(),
    }
}

/// Format one result as a table of path, status and emblem
///
/// Summary results get a trailing `Summary` line.
pub fn format_result_text(path: &Path, result: &StatusResult, color: bool) -> String {
    let mut out = String::new();
    let heading = path.display().to_string();
    if color {
        out.push_str(&format!("{}\n", heading.bold().underline()));
    } else {
        out.push_str(&format!("{}\n", heading));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Status", "Emblem"]);
    for (entry, status) in result.statuses() {
        let shown = entry
            .strip_prefix(path)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(|rel| rel.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        table.add_row(vec![
            shown,
            format_status(*status, color),
            status.emblem().unwrap_or("-").to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));

    if let Some(summary) = result.summary() {
        out.push_str(&format!("Summary: {}\n", format_status(summary, color)));
    }
    out
}

/// JSON record for one queried path
#[derive(Debug, Serialize)]
struct JsonEntry<'a> {
    path: &'a PathBuf,
    #[serde(flatten)]
    result: &'a StatusResult,
}

/// Format several results as one JSON array
pub fn format_results_json(results: &[(PathBuf, StatusResult)]) -> Result<String, serde_json::Error> {
    let entries: Vec<JsonEntry<'_>> = results
        .iter()
        .map(|(path, result)| JsonEntry { path, result })
        .collect();
    serde_json::to_string_pretty(&entries)
}
