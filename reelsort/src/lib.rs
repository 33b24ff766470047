// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export the helpers the binary and tests share
pub use handlers::{
    apply_overrides, build_augmentor, create_configuration_assets, load_config, open_database,
    resolve_config_dir, resolve_config_path, resolve_database_path,
};
