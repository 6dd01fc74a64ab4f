use clap::{Parser, Subcommand};
use contentcheck_classifiers::CONFIG_ENV_VAR;
use contentcheck_core::ContentType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "contentcheck")]
#[command(
    author,
    version,
    about = "Spam and fake-content detection for email, SMS, news and social media"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load all models and serve the web form
    Serve {
        /// Listen port
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1")]
        address: String,

        /// Registry config file (defaults to ./models/<type> directories)
        #[arg(short, long, env = CONFIG_ENV_VAR)]
        config: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Classify a single text and print the prediction
    Classify {
        /// Content type: Email, SMS, News Article or Social Media
        #[arg(short = 't', long, value_parser = parse_content_type)]
        content_type: ContentType,

        /// Registry config file (defaults to ./models/<type> directories)
        #[arg(short, long, env = CONFIG_ENV_VAR)]
        config: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,

        /// Text to classify
        text: String,
    },
}

fn parse_content_type(s: &str) -> Result<ContentType, String> {
    s.parse().map_err(|e: contentcheck_core::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classify_command() {
        let cli = Cli::try_parse_from([
            "contentcheck",
            "classify",
            "--content-type",
            "News Article",
            "Aliens endorse candidate",
        ])
        .unwrap();

        match cli.command {
            Commands::Classify {
                content_type, text, ..
            } => {
                assert_eq!(content_type, ContentType::NewsArticle);
                assert_eq!(text, "Aliens endorse candidate");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        let result = Cli::try_parse_from(["contentcheck", "classify", "-t", "fax", "hello"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["contentcheck", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { port, address, .. } => {
                assert_eq!(port, 3000);
                assert_eq!(address, "127.0.0.1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
