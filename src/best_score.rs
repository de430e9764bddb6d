use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::types::{BestScoreResponse, Outcome, SessionSummary};

const STORE_VERSION: u8 = 1;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct BestScoreRecord {
    #[serde(rename = "bestScore", alias = "best_score")]
    best_score: i32,
    #[serde(default)]
    sessions: u64,
    #[serde(default)]
    wins: u64,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms", default)]
    updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BestScoreFile {
    version: u8,
    #[serde(flatten)]
    record: BestScoreRecord,
}

#[derive(Clone, Debug, Deserialize)]
struct BestScoreFileRaw {
    version: u8,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

/// Single-record JSON store for the best score and a few lifetime counters.
pub struct BestScoreStore {
    file_path: PathBuf,
    record: BestScoreRecord,
}

impl BestScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let record = load_record(&file_path);
        Self { file_path, record }
    }

    pub fn best_score(&self) -> i32 {
        self.record.best_score
    }

    /// Folds one finished session in and saves. Returns true on a new best.
    pub fn record_session(&mut self, summary: &SessionSummary) -> bool {
        let now_ms = now_ms();
        self.record.sessions += 1;
        if summary.outcome == Some(Outcome::Won) {
            self.record.wins += 1;
        }
        let new_best = summary.score > self.record.best_score;
        if new_best {
            self.record.best_score = summary.score;
        }
        self.record.updated_at_ms = now_ms;

        if let Err(error) = self.save() {
            warn!(path = %self.file_path.display(), %error, "failed to save best score");
        }
        new_best
    }

    pub fn build_response(&self) -> BestScoreResponse {
        let sessions = self.record.sessions;
        BestScoreResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            best_score: self.record.best_score,
            sessions,
            wins: self.record.wins,
            win_rate: self.record.wins as f64 / sessions.max(1) as f64,
            updated_at_ms: self.record.updated_at_ms,
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = BestScoreFile {
            version: STORE_VERSION,
            record: self.record.clone(),
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.file_path, text)?;
        Ok(())
    }
}

fn load_record(path: &Path) -> BestScoreRecord {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read best score store");
            }
            return BestScoreRecord::default();
        }
    };
    let parsed = match serde_json::from_str::<BestScoreFileRaw>(&text) {
        Ok(value) if value.version == STORE_VERSION => value,
        Ok(value) => {
            warn!(
                path = %path.display(),
                version = value.version,
                "unsupported best score store version"
            );
            return BestScoreRecord::default();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse best score store");
            return BestScoreRecord::default();
        }
    };

    match serde_json::from_value::<BestScoreRecord>(serde_json::Value::Object(parsed.rest)) {
        Ok(record) => sanitize_record(record),
        Err(error) => {
            warn!(path = %path.display(), %error, "dropping invalid best score record");
            BestScoreRecord::default()
        }
    }
}

fn sanitize_record(value: BestScoreRecord) -> BestScoreRecord {
    BestScoreRecord {
        best_score: value.best_score.max(0),
        sessions: value.sessions,
        wins: value.wins.min(value.sessions),
        updated_at_ms: value.updated_at_ms,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
