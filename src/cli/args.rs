//! CLI argument definitions using clap
//!
//! Commands:
//! - tabquery describe --config <path> --dataset <ref>...
//! - tabquery ask --config <path> --dataset <ref>... --question <text>
//! - tabquery serve --config <path> --dataset <ref>...
//! - tabquery upload --config <path> --file <local> --name <blob>
//! - tabquery sentiment --config <path> --text <text>
//!
//! A dataset reference is `name=location` or just `location`, in which
//! case the name is the file stem.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::dataset::SourceRef;

/// tabquery - ask questions of tabular data in plain language
#[derive(Parser, Debug)]
#[command(name = "tabquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load datasets and print the schema the planner sees
    Describe {
        /// Path to configuration file
        #[arg(long, default_value = "./tabquery.json")]
        config: PathBuf,

        /// Dataset to load (repeatable)
        #[arg(long = "dataset", required = true)]
        datasets: Vec<SourceRef>,
    },

    /// Answer one question and exit
    Ask {
        /// Path to configuration file
        #[arg(long, default_value = "./tabquery.json")]
        config: PathBuf,

        /// Dataset to load (repeatable)
        #[arg(long = "dataset", required = true)]
        datasets: Vec<SourceRef>,

        /// The question, in plain language
        #[arg(long)]
        question: String,
    },

    /// Load datasets, then answer JSON requests from stdin one per line
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./tabquery.json")]
        config: PathBuf,

        /// Dataset to load (repeatable)
        #[arg(long = "dataset", required = true)]
        datasets: Vec<SourceRef>,
    },

    /// Copy a local file into the blob store
    Upload {
        /// Path to configuration file
        #[arg(long, default_value = "./tabquery.json")]
        config: PathBuf,

        /// Local file to upload
        #[arg(long)]
        file: PathBuf,

        /// Blob path to write
        #[arg(long)]
        name: String,
    },

    /// Classify text as positive, negative or neutral
    Sentiment {
        /// Path to configuration file
        #[arg(long, default_value = "./tabquery.json")]
        config: PathBuf,

        /// Text to analyze
        #[arg(long)]
        text: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "tabquery",
            "ask",
            "--dataset",
            "sales=reports/sales.csv",
            "--dataset",
            "regions.json",
            "--question",
            "total sales by region",
        ])
        .unwrap();

        match cli.command {
            Command::Ask {
                config,
                datasets,
                question,
            } => {
                assert_eq!(config, PathBuf::from("./tabquery.json"));
                assert_eq!(datasets[0].name, "sales");
                assert_eq!(datasets[1].name, "regions");
                assert_eq!(question, "total sales by region");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_dataset_required() {
        assert!(Cli::try_parse_from(["tabquery", "describe"]).is_err());
    }

    #[test]
    fn test_bad_dataset_name_rejected() {
        assert!(Cli::try_parse_from(["tabquery", "serve", "--dataset", "bad name=x.csv"]).is_err());
    }

    #[test]
    fn test_parse_sentiment() {
        let cli = Cli::try_parse_from(["tabquery", "sentiment", "--text", "late again"]).unwrap();
        assert!(matches!(cli.command, Command::Sentiment { ref text, .. } if text == "late again"));
    }
}
