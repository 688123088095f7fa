use std::env;

/// Initializes logging: if the user has not set `RUST_LOG`, default to
/// `info` before handing off to `env_logger`.
pub fn setup_logging() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}
