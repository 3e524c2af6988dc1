use serde::{Deserialize, Serialize};

/// Acquisition control. Fire-and-forget: the acknowledgement only says the
/// server accepted the command, not that the device finished acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlCommand {
    Start,
    Stop,
    Reset,
}

impl ControlCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlCommand::Start => "start",
            ControlCommand::Stop => "stop",
            ControlCommand::Reset => "reset",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" => Some(ControlCommand::Start),
            "stop" => Some(ControlCommand::Stop),
            "reset" => Some(ControlCommand::Reset),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        format!("/api/control/{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ControlAck {
    pub fn accepted(&self) -> bool {
        self.error.is_none() && !self.status.is_empty()
    }
}
