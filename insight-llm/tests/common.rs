#![allow(dead_code)]
use std::sync::OnceLock;

use insight_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "insight-tests",
            log_dir: Some(std::env::temp_dir().join("insight-tests")),
            emit_stderr: true,
            format: if std::env::var("INSIGHT_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        insight_common::observability::init_logging(config).unwrap_or_default()
    });
}
