mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rainbow_hd::driver::{self, DriverChain, DriverLocator, FloppySuccessorLocator};
use rainbow_hd::host::{self, StaticHost};
use rainbow_hd::{DiscoveryOptions, HomeBlock, RealModeMemory, SECTOR_SIZE};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, DumpArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let options = match &cli.config {
        Some(path) => DiscoveryOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from {:?}", path))?,
        None => DiscoveryOptions::default(),
    };

    match cli.command {
        Commands::Hom { sector, json } => run_hom(&sector, json),
        Commands::Chain { target } => run_chain(&target, &options),
        Commands::Locate { target, json } => run_locate(&target, &options, json),
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let default = if debug {
        "rainbow_hd=debug"
    } else if verbose {
        "rainbow_hd=info"
    } else {
        "rainbow_hd=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_hom(path: &Path, as_json: bool) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    if data.len() < SECTOR_SIZE {
        bail!("{:?} holds {} bytes, expected a {}-byte sector", path, data.len(), SECTOR_SIZE);
    }

    let hom = HomeBlock::parse(&data)
        .context("Could not retrieve disk geometry from HOM block")?;
    let geometry = hom.geometry();

    if as_json {
        let out = json!({
            "geometry": geometry,
            "volume_id_hex": hex::encode(hom.volume_id),
            "total_sectors": geometry.total_sectors(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "HOM ID: [{}] Volume: [{}]",
        String::from_utf8_lossy(&hom.id),
        hom.volume_label()
    );
    println!("Disk type: {}  Autoboot: {:02X}", hom.type_code, hom.autoboot);
    println!("{}", geometry);
    println!(
        "Sector size: {}  Alternate tracks: {} from track {}",
        hom.sector_size, hom.alt_tracks, hom.first_alt_track
    );
    println!("Total sectors: {}", geometry.total_sectors());
    Ok(())
}

fn open_dump(target: &DumpArgs) -> Result<(StaticHost, RealModeMemory)> {
    let memory = RealModeMemory::load(&target.memory)
        .with_context(|| format!("Failed to load memory dump {:?}", target.memory))?;
    Ok((StaticHost::new(target.dos, target.lol), memory))
}

fn run_chain(target: &DumpArgs, options: &DiscoveryOptions) -> Result<()> {
    let (host, memory) = open_dump(target)?;
    let profile = host::detect_profile(&host);
    let chain = DriverChain::new(&memory, options.max_chain_len);
    let head = chain.first(&host, &profile)?;

    let mut count = 0usize;
    for node in chain.walk(head) {
        let node = node?;
        let mark = if driver::is_four_unit_floppy(&node.header) {
            " <- floppy"
        } else if driver::is_hard_disk_candidate(&node.header) {
            " <- hard disk?"
        } else {
            ""
        };
        println!("{} {}{}", node.address, node.header, mark);
        count += 1;
    }
    println!("{} drivers in chain", count);
    Ok(())
}

fn run_locate(target: &DumpArgs, options: &DiscoveryOptions, as_json: bool) -> Result<()> {
    let (host, memory) = open_dump(target)?;
    let locator: &dyn DriverLocator = &FloppySuccessorLocator::from_options(options);
    let found = driver::discover(&host, &memory, locator, options)
        .context("Hard disk initialization failed")?;

    if as_json {
        let out = json!({
            "profile": found.profile,
            "binding": found.binding,
            "via_fallback": found.located.via_fallback,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "DOS {} (driver segment {:04X}, NUL at +{:#04X})",
        found.profile.version,
        found.profile.driver_segment(),
        found.profile.head_offset()
    );
    println!("Driver header: {}", found.binding.header_address);
    println!(
        "HD Driver Strategy: [{}] Interrupt: [{}]",
        found.binding.strategy, found.binding.interrupt
    );
    if found.located.via_fallback {
        println!("[!] Header position was guessed; verify it with DEBUG.COM");
    }
    Ok(())
}
