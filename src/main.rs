use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, bail};
use mouse_commander::config::AppConfig;
use mouse_commander::dispatcher::{
    CommandInvoker, Completion, ContextMenuSink, DebugReport, DebugSink, DispatchMode, Dispatcher,
};
use mouse_commander::engine::{Engine, EngineMessage};
use mouse_commander::events::{describe_sequence, encode_sequence};
use mouse_commander::wire::{self, InboundMessage};
use mouse_commander::{CommandRef, logging};

const USAGE: &str = "usage: mouse-commander [CONFIG] [--native] [--record-events | --record-sequence]";

struct Options {
    config_path: PathBuf,
    native: bool,
    mode: DispatchMode,
}

impl Options {
    fn parse() -> Result<Self> {
        let mut options = Options {
            config_path: PathBuf::from("Config.toml"),
            native: false,
            mode: DispatchMode::Execute,
        };

        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--native" => options.native = true,
                "--record-events" => options.mode = DispatchMode::RecordEvents,
                "--record-sequence" => options.mode = DispatchMode::RecordSequence,
                "-h" | "--help" => {
                    println!("{}", USAGE);
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') => bail!("unknown option {}\n{}", flag, USAGE),
                path => options.config_path = PathBuf::from(path),
            }
        }
        Ok(options)
    }
}

/// Stand-in for the browser side: reports each command and settles it.
struct Stdout {
    native: bool,
}

impl Stdout {
    fn emit(&self, message: serde_json::Value) {
        if self.native {
            let payload = message.to_string();
            if let Err(e) = wire::write_frame(&mut io::stdout().lock(), payload.as_bytes()) {
                tracing::error!("Failed to write frame: {}", e);
            }
        } else {
            println!("{}", message);
        }
    }
}

struct Invoker(Arc<Stdout>);

impl CommandInvoker for Invoker {
    fn invoke(&self, command: &CommandRef, completion: Completion) {
        self.0.emit(serde_json::json!({ "command": &**command }));
        completion.settle(Ok(()));
    }
}

struct ContextMenu(Arc<Stdout>);

impl ContextMenuSink for ContextMenu {
    fn suppress_next(&self) {
        self.0.emit(serde_json::json!({ "contextMenu": "suppress" }));
    }

    fn reset(&self) {
        self.0.emit(serde_json::json!({ "contextMenu": "reset" }));
    }
}

struct Recorder(Arc<Stdout>);

impl DebugSink for Recorder {
    fn report(&self, report: DebugReport) {
        let message = match report {
            DebugReport::Event {
                event,
                held,
                command,
            } => serde_json::json!({
                "event": event.encode(),
                "name": event.to_string(),
                "buttonsDown": held.bits(),
                "command": command.as_deref(),
            }),
            DebugReport::Sequence { recorded, command } => serde_json::json!({
                "sequence": encode_sequence(&recorded),
                "description": describe_sequence(&recorded),
                "command": command.as_deref(),
            }),
        };
        self.0.emit(message);
    }
}

fn main() -> Result<()> {
    let options = Options::parse()?;

    let config = AppConfig::load_or_create(&options.config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            options.config_path.display()
        )
    })?;
    logging::init(config.debug_logging);

    let stdout = Arc::new(Stdout {
        native: options.native,
    });
    let mut dispatcher = Dispatcher::new(
        &config,
        Box::new(Invoker(stdout.clone())),
        Box::new(ContextMenu(stdout.clone())),
    )
    .with_debug_sink(Box::new(Recorder(stdout)));
    dispatcher.set_mode(options.mode);

    let engine = Engine::spawn(dispatcher)?;
    tracing::info!(config = %options.config_path.display(), "listening on stdin");

    if options.native {
        feed_frames(&engine)?;
    } else {
        feed_lines(&engine, &options.config_path)?;
    }

    // Let pending long presses and sequence timeouts run out before exiting.
    thread::sleep(config.long_press_duration() + config.sequence_timeout());
    engine.shutdown();
    Ok(())
}

fn feed_frames(engine: &Engine) -> Result<()> {
    let mut stdin = io::stdin().lock();
    while let Some(frame) = wire::read_frame(&mut stdin).context("Failed to read frame")? {
        match InboundMessage::from_json(&frame) {
            Ok(message) => {
                engine.send(EngineMessage::Inbound(message));
            }
            Err(err) => tracing::warn!(%err, "dropping frame"),
        }
    }
    Ok(())
}

/// Plain text driver: tokens separated by commas or whitespace, plus a few
/// `!` directives for focus and reloading.
fn feed_lines(engine: &Engine, config_path: &Path) -> Result<()> {
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();

        match line {
            "" => {}
            "!focus" => {
                engine.send(EngineMessage::Focus(true));
            }
            "!blur" => {
                engine.send(EngineMessage::Focus(false));
            }
            "!reload" => match AppConfig::load_from_file(config_path) {
                Ok(config) => {
                    engine.reload(config);
                }
                Err(e) => tracing::error!("Failed to reload configuration: {}", e),
            },
            _ => {
                for token in line
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                {
                    engine.send_token(token);
                }
            }
        }
    }
    Ok(())
}
