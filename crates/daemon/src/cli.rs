use std::path::PathBuf;

use clap::Parser;

const DEFAULT_PORT: u16 = 8888;

/// Command-line configuration, mirroring the original server's `argparse`
/// surface one-for-one.
#[derive(Debug, Parser)]
#[command(name = "chatd", about = "Multi-user chat and file-exchange daemon")]
pub struct Config {
    /// Path to a SQLite3 database to use.
    #[arg(short, long, value_name = "PATH", default_value = "db.sqlite3")]
    pub database: PathBuf,

    /// Path to a directory to hold files uploaded to the server.
    #[arg(short, long, value_name = "PATH", default_value = "files")]
    pub files: PathBuf,

    /// Port for the server to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Turn off logging.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}
