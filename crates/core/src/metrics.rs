//! Lightweight metrics recorder (JSONL) for solver diagnostics.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::diagnostics::FieldSummary;
use crate::grid_config::GridConfig;
use crate::transform::TransformDirection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub output: Option<PathBuf>,
}

/// Appends one JSON object per event to a file.
pub struct MetricsRecorder {
    writer: Mutex<File>,
}

impl MetricsRecorder {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(file),
        })
    }

    pub fn emit(&self, event: MetricsEvent<'_>) {
        if let Err(err) = self.write_event(event) {
            warn!("[metrics] failed to write event: {err}");
        }
    }

    /// Emit the transform counters accumulated on `config`.
    pub fn record_transforms(&self, config: &GridConfig) {
        self.emit(MetricsEvent::TransformTotals {
            forward: config.transform_count(TransformDirection::Forward),
            backward: config.transform_count(TransformDirection::Backward),
        });
    }

    fn write_event(&self, event: MetricsEvent<'_>) -> io::Result<()> {
        let line = serde_json::to_vec(&EventEnvelope {
            timestamp_ms: now_millis(),
            event,
        })?;
        let mut file = self.writer.lock();
        file.write_all(&line)?;
        file.write_all(b"\n")
    }
}

#[derive(Serialize)]
struct EventEnvelope<'a> {
    timestamp_ms: f64,
    #[serde(flatten)]
    event: MetricsEvent<'a>,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricsEvent<'a> {
    FieldSummary {
        step: usize,
        summary: &'a FieldSummary,
    },
    TransformTotals {
        forward: usize,
        backward: usize,
    },
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

impl MetricsConfig {
    pub fn build_recorder(&self) -> io::Result<Option<MetricsRecorder>> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.output.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "metrics.output must be set when metrics are enabled",
            )
        })?;
        MetricsRecorder::new(path).map(Some)
    }
}
