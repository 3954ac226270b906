// tests/integration/main.rs

mod config_loading;
mod env_overrides;
mod error_handling;
mod fs_abstraction;
