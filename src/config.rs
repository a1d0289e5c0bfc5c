use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    #[serde(default = "default_sequence_timeout_ms")]
    pub sequence_timeout_ms: u64,
    #[serde(default = "default_no_focus_timeout_secs")]
    pub no_focus_timeout_secs: u64,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub events: Vec<EventBinding>,
    #[serde(default)]
    pub sequences: Vec<SequenceBinding>,
}

/// Event kinds as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MouseUp,
    MouseDown,
    ScrollUp,
    ScrollDown,
    LongPress,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::MouseUp => "mouse_up",
            EventKind::MouseDown => "mouse_down",
            EventKind::ScrollUp => "scroll_up",
            EventKind::ScrollDown => "scroll_down",
            EventKind::LongPress => "long_press",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventBinding {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Ignored for scroll events.
    #[serde(default)]
    pub button: Option<String>,
    #[serde(default, alias = "buttonsDown")]
    pub buttons_down: Vec<String>,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SequenceBinding {
    pub sequence: String,
    pub command: String,
}

fn default_long_press_ms() -> u64 {
    300
}
fn default_sequence_timeout_ms() -> u64 {
    350
}
fn default_no_focus_timeout_secs() -> u64 {
    60
}

const MIN_TIMER_MS: u64 = 50;

/// Quoted and escaped TOML basic string.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press_ms(),
            sequence_timeout_ms: default_sequence_timeout_ms(),
            no_focus_timeout_secs: default_no_focus_timeout_secs(),
            debug_logging: false,
            events: vec![
                EventBinding {
                    kind: EventKind::ScrollDown,
                    button: None,
                    buttons_down: vec!["secondary".to_string()],
                    command: "switchToNextTab".to_string(),
                },
                EventBinding {
                    kind: EventKind::ScrollUp,
                    button: None,
                    buttons_down: vec!["secondary".to_string()],
                    command: "switchToPreviousTab".to_string(),
                },
            ],
            sequences: vec![SequenceBinding {
                sequence: "c11,c01,c11,c01".to_string(),
                command: "closeCurrentTab".to_string(),
            }],
        }
    }
}

impl AppConfig {
    pub fn long_press_duration(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.sequence_timeout_ms)
    }

    /// `None` disables the idle disconnect.
    pub fn no_focus_timeout(&self) -> Option<Duration> {
        (self.no_focus_timeout_secs > 0).then(|| Duration::from_secs(self.no_focus_timeout_secs))
    }

    /// Load config from file, or create default if not exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            let default_config = Self::default();
            default_config.save_to_file(&path)?;
            return Ok(default_config);
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: AppConfig = toml::from_str(content)?;

        if config.long_press_ms < MIN_TIMER_MS {
            config.long_press_ms = MIN_TIMER_MS;
        }
        if config.sequence_timeout_ms < MIN_TIMER_MS {
            config.sequence_timeout_ms = MIN_TIMER_MS;
        }

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut result = format!(
            "long_press_ms = {}            # Hold time before a press counts as a long press (ms)\n\
             sequence_timeout_ms = {}      # Idle time that abandons a partial gesture sequence (ms)\n\
             no_focus_timeout_secs = {}     # Drop gesture state after this long without focus (0 = never)\n\
             debug_logging = {}          # Verbose logging (RUST_LOG is honoured when enabled)\n\n\
             # Direct bindings: type = mouse_up | mouse_down | scroll_up | scroll_down | long_press\n\
             # button = primary | middle | secondary, buttons_down = other buttons that must be held\n",
            self.long_press_ms,
            self.sequence_timeout_ms,
            self.no_focus_timeout_secs,
            self.debug_logging,
        );

        for binding in &self.events {
            result.push_str("[[events]]\n");
            result.push_str(&format!("type = \"{}\"\n", binding.kind.as_str()));
            if let Some(button) = &binding.button {
                result.push_str(&format!("button = {}\n", toml_string(button)));
            }
            let held = binding.buttons_down.iter().map(|b| toml_string(b)).collect::<Vec<_>>();
            result.push_str(&format!("buttons_down = [{}]\n", held.join(", ")));
            result.push_str(&format!("command = {}\n\n", toml_string(&binding.command)));
        }

        result.push_str(
            "# Gesture sequences: c<type><button> tokens (type 0 up, 1 down, 2 long press;\n\
             # button 0 primary, 1 middle, 2 secondary) and s1 / s0 for scroll up / down\n",
        );
        for binding in &self.sequences {
            result.push_str("[[sequences]]\n");
            result.push_str(&format!("sequence = {}\n", toml_string(&binding.sequence)));
            result.push_str(&format!("command = {}\n\n", toml_string(&binding.command)));
        }

        fs::write(path, result)?;
        Ok(())
    }
}
