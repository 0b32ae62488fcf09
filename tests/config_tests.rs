//! Option files and memory dumps on disk

mod common;

use common::*;
use rainbow_hd::driver::{discover, FloppySuccessorLocator};
use rainbow_hd::options::{DEFAULT_FALLBACK_OFFSET, DEFAULT_MAX_CHAIN_LEN};
use rainbow_hd::{DiscoveryOptions, FarPtr, RealModeMemory, SystemMemory};
use rstest::*;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

// ============================================================================
// DiscoveryOptions Tests
// ============================================================================

#[rstest]
fn test_partial_options_keep_defaults(temp_dir: TempDir) {
    let path = temp_dir.path().join("options.json");
    fs::write(&path, r#"{ "allow_fallback": false }"#).unwrap();

    let options = DiscoveryOptions::from_json_file(&path).unwrap();
    assert!(!options.allow_fallback);
    assert_eq!(options.fallback_offset, DEFAULT_FALLBACK_OFFSET);
    assert_eq!(options.max_chain_len, DEFAULT_MAX_CHAIN_LEN);
}

#[rstest]
fn test_full_options_round_trip(temp_dir: TempDir) {
    let path = temp_dir.path().join("options.json");
    let written = DiscoveryOptions::default()
        .with_fallback_offset(0x20)
        .with_max_chain_len(16);
    fs::write(&path, serde_json::to_string_pretty(&written).unwrap()).unwrap();

    assert_eq!(DiscoveryOptions::from_json_file(&path).unwrap(), written);
}

#[rstest]
fn test_malformed_options_are_rejected(temp_dir: TempDir) {
    let path = temp_dir.path().join("options.json");
    fs::write(&path, r#"{ "fallback_offset": "eighteen" }"#).unwrap();

    assert!(DiscoveryOptions::from_json_file(&path).is_err());
    assert!(DiscoveryOptions::from_json_file(temp_dir.path().join("missing.json")).is_err());
}

#[rstest]
fn test_zero_chain_length_is_rejected(temp_dir: TempDir) {
    let path = temp_dir.path().join("options.json");
    fs::write(&path, r#"{ "max_chain_len": 0 }"#).unwrap();

    let err = DiscoveryOptions::from_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("max_chain_len"));
    assert!(DiscoveryOptions::default().validate().is_ok());
}

// ============================================================================
// Memory Dump Tests
// ============================================================================

#[rstest]
fn test_discovery_from_saved_dump(temp_dir: TempDir) {
    let (host, memory) = scenario_a();
    let nodes_end = head_address(DOS_311).wrapping_add(3 * NODE_SPACING).linear() as usize;
    let mut image = vec![0u8; nodes_end];
    memory.read(FarPtr::new(0, 0), &mut image).unwrap();

    let path = temp_dir.path().join("lowmem.bin");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(&image).unwrap();
    file.sync_all().unwrap();

    let loaded = RealModeMemory::load(&path).unwrap();
    assert_eq!(loaded.len(), nodes_end);

    let options = DiscoveryOptions::default();
    let found = discover(
        &host,
        &loaded,
        &FloppySuccessorLocator::from_options(&options),
        &options,
    )
    .unwrap();
    assert_eq!(found.binding.strategy, FarPtr::new(0x0070, HD_STRATEGY));
}

#[rstest]
fn test_empty_dump_is_rejected(temp_dir: TempDir) {
    let path = temp_dir.path().join("empty.bin");
    fs::File::create(&path).unwrap();

    assert!(RealModeMemory::load(&path).is_err());
}
