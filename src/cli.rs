use clap::Parser;
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "bw", version = VERSION, about = "Bulletin Watcher TUI")]
pub struct Cli {
    /// Base URL of the bulletin API
    #[arg(short, long, env = "BW_API_URL", default_value = "http://localhost:5000")]
    pub url: String,

    /// Poll interval in seconds
    #[arg(short, long, env = "BW_POLL_INTERVAL", default_value_t = 30)]
    pub interval: u64,

    /// Directory where downloaded products and exported logs are written
    #[arg(short, long, env = "BW_DOWNLOAD_DIR", default_value = ".")]
    pub download_dir: PathBuf,

    /// Write diagnostics to this file (filter with RUST_LOG)
    #[arg(long, env = "BW_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard() {
        let cli = Cli::try_parse_from(["bw"]).unwrap();
        assert_eq!(cli.interval, 30);
        assert_eq!(cli.download_dir, PathBuf::from("."));
        assert!(cli.log_file.is_none());
        assert!(!cli.no_notify);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "bw",
            "--url",
            "http://monitor:8080",
            "-i",
            "5",
            "--download-dir",
            "/tmp/out",
            "--no-notify",
        ])
        .unwrap();
        assert_eq!(cli.url, "http://monitor:8080");
        assert_eq!(cli.interval, 5);
        assert_eq!(cli.download_dir, PathBuf::from("/tmp/out"));
        assert!(cli.no_notify);
    }
}
