//! Code related to CLI things
//!

use clap::*;

#[derive(Parser, Clone)]
pub struct SharedOpts {
    #[clap(short, long, help = "Configuration file")]
    config: Option<String>,
    #[clap(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look for instances of a service type and print what answers
    Browse {
        #[clap(flatten)]
        sopt: SharedOpts,
        /// Service type, eg _http._tcp
        service: String,
        #[clap(short, long, help = "Seconds to wait for answers", default_value = "3")]
        timeout: u64,
        #[clap(long, help = "Ask for unicast responses (sets the QU bit)")]
        unicast: bool,
        #[clap(short, long, help = "Pin traffic to this interface")]
        interface: Option<String>,
        #[clap(long, default_value = "local")]
        domain: String,
    },
    /// Advertise the services from the config file until interrupted
    Respond {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
    /// Print a default configuration file
    DefaultConfig,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Respond {
            sopt: SharedOpts {
                config: None,
                debug: false,
            },
        }
    }
}

#[derive(Parser)]
#[command(arg_required_else_help(true))]
/// A multicast DNS responder and DNS-SD service browser. Yells on the local link so you don't have to.
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config(&self) -> Option<String> {
        match &self.command {
            Commands::Browse { sopt, .. } => sopt.config.clone(),
            Commands::Respond { sopt } => sopt.config.clone(),
            _ => None,
        }
    }

    pub fn debug(&self) -> bool {
        match &self.command {
            Commands::Browse { sopt, .. } => sopt.debug,
            Commands::Respond { sopt } => sopt.debug,
            _ => false,
        }
    }
}
