pub mod config {
    use serde::Deserialize;
    use std::path::PathBuf;

    /// Which backend persists tasks.
    #[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum StoreKind {
        #[default]
        Database,
        Json,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default)]
        pub store: StoreKind,
        #[serde(default)]
        pub db_url: Option<String>,
        #[serde(default = "default_tasks_path")]
        pub tasks_path: PathBuf,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_db_max_connections")]
        pub db_max_connections: u32,
        #[serde(default = "default_db_min_connections")]
        pub db_min_connections: u32,
        #[serde(default = "default_db_max_lifetime_secs")]
        pub db_max_lifetime_secs: u64,
        /// Logs every SQL statement when set; meant for local development.
        #[serde(default)]
        pub db_log_queries: bool,
    }

    impl Config {
        /// Loads configuration from `ADVISOR_`-prefixed environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::with_prefix("ADVISOR"))
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_tasks_path() -> PathBuf {
        PathBuf::from("tasks.json")
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_db_max_connections() -> u32 {
        25
    }

    fn default_db_min_connections() -> u32 {
        10
    }

    fn default_db_max_lifetime_secs() -> u64 {
        30 * 60
    }

}
pub mod cli;
pub mod entities;
pub mod task;
pub mod web;
