use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/wellpoints.db)
  PORT        (default: 8080 or config.listen_port)

The `hash-password` command produces a bcrypt hash suitable for the
`password_hash` field of a user entry in the config file.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "wellpoints-server",
    version,
    about = "Wellness points tracking server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hash a password for use in the config file
    HashPassword {
        /// The plaintext password to hash
        password: String,
        /// bcrypt cost factor
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}
