mod loader;
mod types;

pub use loader::{
    ENV_API_TOKEN, ENV_DOWNLOAD_DIR, ENV_NEXUS_HOST, ENV_PORT, ENV_SLACK_BOT_TOKEN, apply_env_overrides,
    default_config_path, load_allowlist_file, load_config, resolve_config,
};
pub use types::*;
