//! CLI argument definitions using clap.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hvc_core::DEFAULT_PORT;

/// hvc - Command-line host for Home Ventilation Control appliances
#[derive(Parser, Debug)]
#[command(name = "hvc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Reply timeout in milliseconds
    #[arg(long, global = true, default_value = "5000", env = "HVC_TIMEOUT")]
    pub timeout: u64,

    /// Appliance UDP port
    #[arg(long, global = true, default_value_t = DEFAULT_PORT, env = "HVC_PORT")]
    pub port: u16,

    /// Broadcast address to discover on (repeat for several interfaces)
    #[arg(
        long = "broadcast",
        global = true,
        default_value = "255.255.255.255",
        value_delimiter = ','
    )]
    pub broadcast: Vec<IpAddr>,

    /// Directory for the known-device store
    #[arg(long, global = true, env = "HVC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover appliances on the local network
    Discover(DiscoverArgs),

    /// Show the readings of one or more appliances
    Status(StatusArgs),

    /// Read a single dotted-path value
    Get(GetArgs),

    /// Send a raw JSON command
    Send(SendArgs),

    /// Adjust a fan through its Wi-Fi override
    Fan(FanArgs),

    /// Keep sessions alive and follow their updates
    Watch(WatchArgs),

    /// Manage the known-device store
    Devices(DevicesArgs),
}

// ==================== Discover ====================

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Collection window after the first reply, in milliseconds
    #[arg(long, default_value = "1000")]
    pub grace: u64,

    /// Store every discovered appliance as a known device
    #[arg(long)]
    pub save: bool,
}

// ==================== Status ====================

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Known unique id, host[:port], or "all"
    pub target: String,

    /// Print the raw document instead of readings
    #[arg(long)]
    pub raw: bool,

    /// Include readings that are hidden by default
    #[arg(long)]
    pub all_fields: bool,
}

// ==================== Get ====================

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Known unique id or host[:port]
    pub target: String,

    /// Dotted path into the document, e.g. "0.controller.millivolts"
    pub path: String,
}

// ==================== Send ====================

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Known unique id or host[:port]
    pub target: String,

    /// JSON object with command fields
    pub command: String,

    /// Wait for the appliance to push its updated document
    #[arg(long)]
    pub wait: bool,
}

// ==================== Fan ====================

#[derive(Args, Debug)]
pub struct FanArgs {
    /// Known unique id or host[:port]
    pub target: String,

    /// Fan: 0/main or 1/hood
    pub fan: String,

    /// Adjustment in percent, -100 to 100
    #[arg(allow_negative_numbers = true)]
    pub percent: f64,
}

// ==================== Watch ====================

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Known unique id, host[:port], or "all"
    pub target: String,

    /// Seconds between keepalive/receive ticks
    #[arg(long, default_value = "10")]
    pub interval: u64,

    /// Minutes between rediscovery rounds
    #[arg(long, default_value = "15")]
    pub rediscover: u64,
}

// ==================== Devices ====================

#[derive(Args, Debug)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommands,
}

#[derive(Subcommand, Debug)]
pub enum DevicesCommands {
    /// List known devices
    List,

    /// Discover appliances at host[:port] and remember them
    Add(DevicesAddArgs),

    /// Forget a known device
    Remove(DevicesRemoveArgs),
}

#[derive(Args, Debug)]
pub struct DevicesAddArgs {
    /// host[:port] of the appliance
    pub address: String,
}

#[derive(Args, Debug)]
pub struct DevicesRemoveArgs {
    /// Unique id of the device
    pub unique_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["hvc", "discover"]).unwrap();
        assert_eq!(cli.port, 38866);
        assert_eq!(cli.timeout, 5000);
        assert_eq!(cli.broadcast, vec!["255.255.255.255".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn test_negative_fan_percent() {
        let cli = Cli::try_parse_from(["hvc", "fan", "hvc-1", "main", "-35"]).unwrap();
        match cli.command {
            Commands::Fan(args) => assert_eq!(args.percent, -35.0),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_multiple_broadcasts() {
        let cli = Cli::try_parse_from([
            "hvc",
            "discover",
            "--broadcast",
            "192.168.1.255,10.0.0.255",
        ])
        .unwrap();
        assert_eq!(cli.broadcast.len(), 2);
    }
}
