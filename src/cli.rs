use clap::{Parser, Subcommand};
use rainbow_hd::{DosVersion, FarPtr};
use std::path::PathBuf;

/// rainbow-hd - Rainbow 100 hard disk inspection
///
/// Works on captures taken on the machine: a dumped HOM sector, or a dump
/// of real-mode memory together with the DOS version and the pointer DOS
/// returned from INT 21h function 52h.
#[derive(Parser)]
#[command(name = "rainbow-hd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Locate the Rainbow Winchester driver and decode HOM blocks", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// JSON file with discovery options
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a dumped HOM sector
    Hom {
        /// File holding the 512-byte sector
        sector: PathBuf,

        /// Print the geometry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print every header in the device driver chain
    Chain {
        #[command(flatten)]
        target: DumpArgs,
    },

    /// Find and bind the hard disk driver
    Locate {
        #[command(flatten)]
        target: DumpArgs,

        /// Print the binding as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
pub struct DumpArgs {
    /// Real-mode memory dump starting at linear address 0
    pub memory: PathBuf,

    /// List-of-lists pointer as SEGMENT:OFFSET (ES:BX from INT 21h/52h)
    #[arg(long, value_parser = parse_far_ptr)]
    pub lol: FarPtr,

    /// DOS version, e.g. 3.10b
    #[arg(long, value_parser = parse_dos_version)]
    pub dos: DosVersion,
}

fn parse_far_ptr(s: &str) -> Result<FarPtr, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_dos_version(s: &str) -> Result<DosVersion, String> {
    s.parse().map_err(|e| format!("{}", e))
}
