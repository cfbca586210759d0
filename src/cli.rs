use clap::{Parser, Subcommand};

use crate::models::{
    DEFAULT_MARKER, DEFAULT_MAX_COLUMNS, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_TIMEOUT_SECS,
};

#[derive(Parser)]
#[command(name = "uniondump")]
#[command(version, about = "UNION-based SQL injection scanner and schema dumper")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Scan {
        #[arg(short, long)]
        url: String,

        #[arg(short, long, default_value = "id")]
        param: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Comma separated tamper transforms, applied in order
        #[arg(long, value_delimiter = ',')]
        tamper: Vec<String>,

        #[arg(long)]
        proxy: Option<String>,

        #[arg(long)]
        cookie: Option<String>,

        #[arg(long)]
        user_agent: Option<String>,

        /// Extra header as 'Name: value', repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Requests per second
        #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
        rate: f64,

        #[arg(long, default_value_t = DEFAULT_MAX_COLUMNS)]
        max_columns: usize,

        #[arg(long, default_value = DEFAULT_MARKER)]
        marker: String,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long)]
        verbose: bool,
    },

    Report {
        #[arg(short, long)]
        input: String,
    },

    Tampers,
}

pub fn parse_header(input: &str) -> Result<(String, String), String> {
    let (name, value) = input
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{}', expected 'Name: value'", input))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{}', empty name", input));
    }

    Ok((name.to_string(), value.trim().to_string()))
}
