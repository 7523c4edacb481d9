use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// Dependencies whose output is only shown at TRACE.
const FILTERED_MODULES: &[&str] = &[
    "sqlx", "sea_orm", "tower", "tower_http", "tracing", "hyper", "h2", "axum",
];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger from `config`.
    ///
    /// Calling this more than once keeps the first logger and reports the
    /// failure on stderr, since there is no logger to report it to.
    pub fn init_logger(config: &Config) {
        let level = config.log_level_filter;
        let log_config = Self::build_log_config(Self::should_filter_dependencies(level));

        if let Err(e) = simplelog::TermLogger::init(
            level,
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ) {
            eprintln!("Failed to start simplelog: {e}");
        }
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();
        // Keep the emitting module on every line so stream lifecycles can be followed.
        builder.set_target_level(LevelFilter::Error);

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noisy_http_and_database_crates_are_filtered() {
        for module in ["sqlx", "sea_orm", "hyper", "axum", "tower_http"] {
            assert!(FILTERED_MODULES.contains(&module), "{module} should be filtered");
        }
    }

    #[test]
    fn own_crates_are_never_filtered() {
        for module in ["sse", "events", "domain", "web"] {
            assert!(!FILTERED_MODULES.contains(&module));
        }
    }

    #[test]
    fn only_trace_shows_dependency_logs() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(Logger::should_filter_dependencies(level));
        }
    }

    #[test]
    fn log_config_builds_with_and_without_filters() {
        let _filtered = Logger::build_log_config(true);
        let _unfiltered = Logger::build_log_config(false);
    }
}
