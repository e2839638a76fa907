use crate::document::Document;
use crate::error::{Result, TambolaError};
use crate::lobby::GameCode;
use serde::{Deserialize, Serialize};

/// A marked point on the ticket, in the image's unscaled pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub x: f64,
    pub y: f64,
}

impl Mark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Shared lobby record. The code is the document id and is not part of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    #[serde(skip)]
    pub code: GameCode,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub started: bool,
}

impl Game {
    pub fn new(code: GameCode, host: &str) -> Self {
        Self {
            code,
            host: host.to_string(),
            players: vec![host.to_string()],
            started: false,
        }
    }

    pub fn from_document(code: GameCode, document: Document) -> Result<Self> {
        let mut game: Game = serde_json::from_value(serde_json::Value::Object(document))?;
        game.code = code;
        Ok(game)
    }

    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(TambolaError::internal(format!(
                "Game serialized to non-object: {}",
                other
            ))),
        }
    }
}
