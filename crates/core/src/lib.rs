pub mod client;
pub mod domain;
pub mod export;
pub mod map;
pub mod orchestrator;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub api_base_url: Option<String>,
        pub news_api_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub export_dir: Option<PathBuf>,
        pub export_font_path: Option<PathBuf>,
        pub map_svg_path: Option<PathBuf>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                api_base_url: non_empty_var("API_BASE_URL"),
                news_api_base_url: non_empty_var("NEWS_API_BASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                export_dir: non_empty_var("EXPORT_DIR").map(PathBuf::from),
                export_font_path: non_empty_var("EXPORT_FONT_PATH").map(PathBuf::from),
                map_svg_path: non_empty_var("MAP_SVG_PATH").map(PathBuf::from),
            })
        }

        pub fn require_api_base_url(&self) -> anyhow::Result<&str> {
            self.api_base_url
                .as_deref()
                .context("API_BASE_URL is required")
        }

        pub fn require_map_svg_path(&self) -> anyhow::Result<&std::path::Path> {
            self.map_svg_path
                .as_deref()
                .context("MAP_SVG_PATH is required to render the region map")
        }

        /// Export directory, defaulting to the current directory.
        pub fn export_dir_or_default(&self) -> PathBuf {
            self.export_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."))
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
