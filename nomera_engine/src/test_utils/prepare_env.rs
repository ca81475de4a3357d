use log::*;

/// Loads `.env.test` if present and initialises logging once per process.
pub fn prepare_env() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}
