//! Process environment and logging setup.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Load `.env` and build the log filter from the resulting environment.
///
/// `.env` is read first so a `RUST_LOG` set there takes effect. Variables
/// already present in the process environment are never overridden. With
/// no explicit path the usual search from the working directory applies.
pub fn load_env_filter(dotenv: Option<&Path>) -> EnvFilter {
    match dotenv {
        Some(path) => {
            dotenvy::from_path(path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_from_dotenv_is_honoured() {
        // An externally set RUST_LOG wins over .env and makes this moot.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=voxgate=trace\n").unwrap();

        let filter = load_env_filter(Some(&path));
        assert_eq!(filter.to_string(), "voxgate=trace");
    }
}
