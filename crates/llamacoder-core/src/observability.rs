use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const ENABLED_KEYS: [&str; 2] = [
    "LLAMACODER_OBSERVABILITY_ENABLED",
    "LLAMACODER_OBSERVABILITY",
];
const LEVEL_KEY: &str = "LLAMACODER_LOG_LEVEL";
const JSON_LOG_PATH_KEY: &str = "LLAMACODER_JSON_LOG_PATH";
const DEFAULT_JSON_LOG_FILE: &str = "llamacoder.logs.jsonl";

pub(crate) fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Directory and file name for the JSONL log; bare file names land in `.`.
fn json_log_location(raw: &str) -> (PathBuf, String) {
    let path = Path::new(raw.trim());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_JSON_LOG_FILE)
        .to_string();
    (dir, file_name)
}

fn observability_enabled() -> bool {
    for key in ENABLED_KEYS {
        if let Ok(value) = std::env::var(key) {
            return parse_bool_env(&value).unwrap_or(true);
        }
    }
    true
}

fn resolve_env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var(LEVEL_KEY)
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `LLAMACODER_OBSERVABILITY_ENABLED` / `LLAMACODER_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `LLAMACODER_LOG_LEVEL`: optional level/filter override (`info`, `debug`, `llamacoder_ai=trace`, ...).
/// - `LLAMACODER_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs are emitted to stdout in a compact console format.
/// - `RUST_LOG`: fallback filter when `LLAMACODER_LOG_LEVEL` is unset or invalid.
pub fn init_observability() {
    INIT.get_or_init(|| {
        if !observability_enabled() {
            return;
        }

        let env_filter = resolve_env_filter();
        if let Ok(path_raw) = std::env::var(JSON_LOG_PATH_KEY) {
            let (dir, file_name) = json_log_location(&path_raw);
            if dir != Path::new(".") {
                let _ = std::fs::create_dir_all(&dir);
            }
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stdout);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    });
}
