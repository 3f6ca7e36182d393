//! Run directories and the files suites leave in them.
//!
//! Layout: `<artifacts_dir>/<suite>/<YYYYmmdd_HHMMSS>/`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// A directory for one suite run.
#[derive(Debug, Clone)]
pub struct RunDir {
    path: PathBuf,
}

impl RunDir {
    /// Create `<root>/<suite>/<local timestamp>`.
    pub fn create(root: &Path, suite: &str) -> anyhow::Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = root.join(suite).join(stamp);
        fs::create_dir_all(&path)
            .with_context(|| format!("creating run directory {}", path.display()))?;
        tracing::debug!(path = %path.display(), "run directory");
        Ok(RunDir { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a CSV with a header row.
    pub fn write_csv(
        &self,
        name: &str,
        header: &[&str],
        rows: &[Vec<String>],
    ) -> anyhow::Result<PathBuf> {
        let mut text = String::new();
        text.push_str(&header.join(","));
        text.push('\n');
        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| csv_cell(c)).collect();
            let _ = writeln!(text, "{}", cells.join(","));
        }
        self.write_file(name, &text)
    }

    /// Write `context.json`.
    pub fn write_context(&self, context: &serde_json::Value) -> anyhow::Result<PathBuf> {
        let text = serde_json::to_string_pretty(context).context("serializing run context")?;
        self.write_file("context.json", &text)
    }

    fn write_file(&self, name: &str, text: &str) -> anyhow::Result<PathBuf> {
        let path = self.path.join(name);
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Quote a cell if it contains a separator, quote or newline.
fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Number cell; empty when unknown.
pub fn num_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
