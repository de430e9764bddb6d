use serde::Serialize;
use serde_json::Value;

use crate::types::{Direction, Intents, SessionSummary, Snapshot};

/// Upper bound on `dirs` entries; a client only has four movement keys.
const MAX_INPUT_DIRS: usize = 8;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Start,
    Restart,
    Input { intents: Intents },
    Ping { t: f64 },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => Some(ParsedClientMessage::Start),
        "restart" => Some(ParsedClientMessage::Restart),
        "input" => {
            let dirs = object.get("dirs")?.as_array()?;
            if dirs.len() > MAX_INPUT_DIRS {
                return None;
            }
            let mut intents = Intents::none();
            for value in dirs {
                intents.insert(Direction::parse_move(value.as_str()?)?);
            }
            Some(ParsedClientMessage::Input { intents })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        #[serde(rename = "bestScore")]
        best_score: i32,
    },
    State {
        snapshot: Snapshot,
    },
    GameOver {
        summary: SessionSummary,
        #[serde(rename = "bestScore")]
        best_score: i32,
    },
    Pong {
        t: f64,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}
