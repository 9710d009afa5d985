use clap::Parser;

const DEFAULT_PORT: u16 = 8080;

/// Command-line overrides for local development. The one setting spec §6
/// actually requires is the listen port, which also reads from `PORT`.
#[derive(Parser, Debug)]
#[command(version, author = "Mark P. <markrepedersen@gmail.com>")]
struct Opts {
    /// Listen port. Falls back to the `PORT` environment variable, then 8080.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address.
    #[arg(short, long, default_value = "0.0.0.0")]
    addr: String,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub port: u16,
}

impl Config {
    /// Parses CLI args and environment, falling back to spec §6's default
    /// port of 8080 when neither is given.
    pub fn parse() -> Self {
        let opts = Opts::parse();
        Config {
            addr: opts.addr,
            port: opts.port.unwrap_or(DEFAULT_PORT),
        }
    }
}
