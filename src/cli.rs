use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "dupsquash",
    version,
    about = "Find similar documents for every row of a file, in bulk"
)]
pub struct Cli {
    /// Search backend host
    #[arg(long, env = "DUPSQUASH_HOST", default_value = "localhost")]
    pub host: String,

    /// Search backend port
    #[arg(long, env = "DUPSQUASH_PORT", default_value = "9200")]
    pub port: u16,

    /// Single string to compare
    #[arg(short = 'l', long, value_name = "STRING")]
    pub like: Option<String>,

    /// Input file with rows to compare
    #[arg(short = 'i', long, value_name = "FILENAME")]
    pub file: Option<PathBuf>,

    /// Which 1-based column(s) of the file to compare, comma separated
    #[arg(
        short = 'f',
        long,
        alias = "column",
        default_value = "1",
        value_name = "COLUMN[S]"
    )]
    pub columns: String,

    /// Column delimiter of the input file
    #[arg(long, default_value = "\t", value_name = "DELIM")]
    pub delimiter: String,

    /// Value that marks an empty column, also printed for missing fields
    #[arg(long, default_value = "<NULL>", value_name = "STRING")]
    pub null_value: String,

    /// Index or indices to query (space separated)
    #[arg(long, default_value = "", value_name = "NAME[S]")]
    pub index: String,

    /// Index fields to compare against (space separated, dotted paths)
    #[arg(
        short = 'x',
        long,
        default_value = "content.245.a content.245.b",
        value_name = "NAME[S]"
    )]
    pub index_fields: String,

    /// Append the value of every index field to each output line
    #[arg(long)]
    pub extract: bool,

    /// Minimum term frequency passed to the similarity query
    #[arg(long, default_value = "1", value_name = "N")]
    pub min_term_freq: u32,

    /// Maximum number of query terms passed to the similarity query
    #[arg(long, default_value = "25", value_name = "N")]
    pub max_query_terms: u32,

    /// Number of results per query
    #[arg(short = 's', long, default_value = "5", value_name = "N")]
    pub size: usize,

    /// Number of workers, 0 means number of available CPUs
    #[arg(
        short = 'w',
        long,
        default_value = "0",
        allow_negative_numbers = true,
        value_name = "N"
    )]
    pub workers: i64,

    /// Write output in input order instead of completion order
    #[arg(long)]
    pub ordered: bool,

    /// Give up waiting for pending output after this many seconds; rows
    /// not yet written by then are lost
    #[arg(long, value_name = "SECS")]
    pub drain_timeout: Option<f64>,

    /// Increase log verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, hide = true, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Print shell completions for `shell` to stdout.
    pub fn generate_completions(shell: Shell) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            shell,
            &mut cmd,
            "dupsquash",
            &mut std::io::stdout(),
        );
    }
}
