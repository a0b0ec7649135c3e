use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-skew")]
#[command(version, about = "Estimate the skew angle of a scanned page or the first page of a PDF")]
pub struct Cli {
    /// Input PDF or image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Write <input>_lines_detected.jpg with the detected lines drawn in
    #[arg(long)]
    pub visualize: bool,

    /// TOML file overriding detection thresholds
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show detection details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "page_skew=debug"
        } else {
            "page_skew=warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["page-skew", "scan.pdf", "--visualize", "-c", "t.toml"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("scan.pdf"));
        assert!(cli.visualize);
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["page-skew"]).is_err());
    }
}
