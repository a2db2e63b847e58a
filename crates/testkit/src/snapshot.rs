//! Golden-file snapshots of engine state.
//!
//! Snapshots are canonical pretty JSON (object keys sorted) so diffs stay
//! stable across serde map orderings. Tests compare against the file on disk;
//! rerun with `MDA_UPDATE_SNAPSHOTS=1` to rewrite goldens.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Environment variable that switches snapshots to update mode.
pub const UPDATE_SNAPSHOTS_ENV: &str = "MDA_UPDATE_SNAPSHOTS";

/// Compare against the golden file or overwrite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Fail on mismatch or a missing file.
    Assert,
    /// Write the current value.
    Update,
}

impl SnapshotMode {
    /// Mode selected by [`UPDATE_SNAPSHOTS_ENV`].
    pub fn from_env() -> Self {
        match std::env::var(UPDATE_SNAPSHOTS_ENV).as_deref() {
            Ok("1") | Ok("true") | Ok("yes") => SnapshotMode::Update,
            _ => SnapshotMode::Assert,
        }
    }
}

/// Assert that `value` matches the snapshot at `path`, in the mode chosen by
/// the environment.
pub fn assert_json_snapshot<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    check_json_snapshot(path, value, SnapshotMode::from_env())
}

/// [`assert_json_snapshot`] with an explicit mode.
pub fn check_json_snapshot<P: AsRef<Path>, T: Serialize>(
    path: P,
    value: &T,
    mode: SnapshotMode,
) -> Result<()> {
    let path = path.as_ref();
    let actual = canonical_json(value)?;

    if mode == SnapshotMode::Update {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        info!(path = %path.display(), "Updating snapshot");
        return fs::write(path, &actual)
            .with_context(|| format!("Failed to write snapshot {}", path.display()));
    }

    let expected = fs::read_to_string(path).with_context(|| {
        format!(
            "Snapshot missing at {} (run with {UPDATE_SNAPSHOTS_ENV}=1 to create it)",
            path.display()
        )
    })?;
    if let Some((line, want, got)) = first_difference(&expected, &actual) {
        bail!(
            "Snapshot mismatch at {}:{line}\n  expected: {want}\n  actual:   {got}\n(run with {UPDATE_SNAPSHOTS_ENV}=1 to update)",
            path.display()
        );
    }
    Ok(())
}

/// First differing line, 1-based, with both sides.
fn first_difference<'a>(expected: &'a str, actual: &'a str) -> Option<(usize, &'a str, &'a str)> {
    let mut want = expected.lines();
    let mut got = actual.lines();
    let mut line = 0;
    loop {
        line += 1;
        match (want.next(), got.next()) {
            (None, None) => return None,
            (a, b) if a == b => continue,
            (a, b) => return Some((line, a.unwrap_or("<eof>"), b.unwrap_or("<eof>"))),
        }
    }
}

/// Serialize with sorted object keys and a trailing newline.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize snapshot value")?;
    let mut out = serde_json::to_string_pretty(&sort_keys(value))?;
    out.push('\n');
    Ok(out)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
