use clap::{Parser, Subcommand};
use std::net::IpAddr;

use sonos_gateway::VerifyMode;

#[derive(Parser, Debug)]
#[command(name = "sonos-gateway")]
#[command(about = "Discover Sonos speakers, play announcements on them, or emulate them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the speakers that answer a discovery search
    Discover {
        /// Seconds to collect SSDP responses
        #[arg(short, long, default_value_t = 5)]
        window: u64,
    },

    /// Play a media URL on one speaker or all of them
    Play {
        /// Speaker id or name, or "all"
        #[arg(short, long, default_value = "all")]
        target: String,

        /// Media URL the speakers should fetch
        #[arg(short, long)]
        url: String,

        /// Seconds to collect SSDP responses
        #[arg(short, long, default_value_t = 5)]
        window: u64,
    },

    /// Answer discovery and control requests as virtual speakers
    Emulate {
        /// Comma-separated speaker names
        #[arg(short, long, default_value = "Living Room,Kitchen")]
        speakers: String,

        /// HTTP port of the first speaker, the rest follow
        #[arg(short, long, default_value_t = 1400)]
        port: u16,

        /// Check the played URL: off, head or fetch
        #[arg(long, default_value = "off")]
        verify: VerifyMode,

        /// Address written into advertised locations (defaults to the local address)
        #[arg(long)]
        advertise_ip: Option<IpAddr>,
    },
}
