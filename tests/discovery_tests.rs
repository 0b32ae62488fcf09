//! Hard disk driver discovery and binding tests

mod common;

use common::*;
use rainbow_hd::driver::{
    bind, discover, DriverChain, DriverLocator, DriverNode, FloppySuccessorLocator,
    LocatedDriver,
};
use rainbow_hd::host::HostProfile;
use rainbow_hd::{
    DiscoveryOptions, DiskContext, DiskError, FarPtr, RealModeMemory, ScriptedInvoker,
    SubsystemState, SECTOR_SIZE,
};
use rstest::*;
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

fn default_locator() -> FloppySuccessorLocator {
    FloppySuccessorLocator::default()
}

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with warnings and errors captured
fn with_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.text())
}

// ============================================================================
// Locator Tests
// ============================================================================

#[test]
fn test_scenario_a_selects_node_after_floppy() {
    let (host, memory) = scenario_a();
    let found = discover(&host, &memory, &default_locator(), &DiscoveryOptions::default()).unwrap();

    let expected = head_address(DOS_311).wrapping_add(2 * NODE_SPACING);
    assert_eq!(found.located.node.address, expected);
    assert!(!found.located.via_fallback);
    assert_eq!(found.binding.header_address, expected);
    assert_eq!(found.binding.strategy, FarPtr::new(0x0070, HD_STRATEGY));
    assert_eq!(found.binding.interrupt, FarPtr::new(0x0070, HD_INTERRUPT));
}

#[test]
fn test_legacy_dos_binds_in_bios_segment() {
    let mut memory = RealModeMemory::new();
    write_chain(
        &mut memory,
        head_address(DOS_211),
        &[nul(), console(), floppy(), hard_disk()],
    );
    let found = discover(&host(DOS_211), &memory, &default_locator(), &DiscoveryOptions::default())
        .unwrap();

    assert_eq!(found.profile.driver_segment(), 0x0040);
    assert_eq!(found.binding.strategy, FarPtr::new(0x0040, HD_STRATEGY));
}

#[test]
fn test_terminal_floppy_uses_fallback_offset() {
    let mut memory = RealModeMemory::new();
    let addresses = write_chain(&mut memory, head_address(DOS_311), &[nul(), console(), floppy()]);
    let floppy_at = addresses[2];
    let guessed = floppy_at.wrapping_add(18);
    write_header(&mut memory, guessed, &hard_disk(), FarPtr::new(0xFFFF, 0xFFFF));

    let found = discover(&host(DOS_311), &memory, &default_locator(), &DiscoveryOptions::default())
        .unwrap();

    assert!(found.located.via_fallback);
    assert_eq!(found.located.node.address, guessed);
    assert_eq!(found.binding.strategy, FarPtr::new(0x0070, HD_STRATEGY));
}

#[test]
fn test_fallback_is_always_logged() {
    let mut memory = RealModeMemory::new();
    let addresses = write_chain(&mut memory, head_address(DOS_311), &[nul(), floppy()]);
    let guessed = addresses[1].wrapping_add(18);
    write_header(&mut memory, guessed, &hard_disk(), FarPtr::new(0xFFFF, 0xFFFF));

    let (found, log) = with_warnings(|| {
        discover(&host(DOS_311), &memory, &default_locator(), &DiscoveryOptions::default())
    });
    assert!(found.unwrap().located.via_fallback);
    assert!(log.contains("WARN"));
    assert!(log.contains("unverified"));
    assert!(log.contains(&guessed.to_string()));
}

#[test]
fn test_linked_successor_logs_no_warning() {
    let (host, memory) = scenario_a();
    let (found, log) = with_warnings(|| {
        discover(&host, &memory, &default_locator(), &DiscoveryOptions::default())
    });
    assert!(!found.unwrap().located.via_fallback);
    assert!(!log.contains("WARN"), "unexpected warning: {}", log);
}

#[test]
fn test_zero_chain_length_is_reported() {
    let (host, memory) = scenario_a();
    let options = DiscoveryOptions::default().with_max_chain_len(0);
    let result = discover(&host, &memory, &default_locator(), &options);
    assert!(matches!(result, Err(DiskError::ChainTooLong { limit: 0 })));
}

#[test]
fn test_fallback_offset_is_configurable() {
    let mut memory = RealModeMemory::new();
    let addresses = write_chain(&mut memory, head_address(DOS_311), &[nul(), floppy()]);
    let guessed = addresses[1].wrapping_add(0x20);
    write_header(&mut memory, guessed, &hard_disk(), FarPtr::new(0xFFFF, 0xFFFF));

    let options = DiscoveryOptions::default().with_fallback_offset(0x20);
    let locator = FloppySuccessorLocator::from_options(&options);
    let found = discover(&host(DOS_311), &memory, &locator, &options).unwrap();
    assert_eq!(found.located.node.address, guessed);
}

#[test]
fn test_strict_options_refuse_fallback() {
    let mut memory = RealModeMemory::new();
    let addresses = write_chain(&mut memory, head_address(DOS_311), &[nul(), floppy()]);
    write_header(
        &mut memory,
        addresses[1].wrapping_add(18),
        &hard_disk(),
        FarPtr::new(0xFFFF, 0xFFFF),
    );

    let options = DiscoveryOptions::default().strict();
    let locator = FloppySuccessorLocator::from_options(&options);
    let result = discover(&host(DOS_311), &memory, &locator, &options);
    assert!(matches!(result, Err(DiskError::DriverNotFound)));
}

#[rstest]
#[case(vec![nul()])]
#[case(vec![nul(), console()])]
#[case(vec![nul(), console(), hard_disk()])]
fn test_chain_without_floppy_is_not_found(#[case] nodes: Vec<NodeLayout>) {
    let memory = memory_with_chain(&nodes);
    let result = discover(&host(DOS_311), &memory, &default_locator(), &DiscoveryOptions::default());
    assert!(matches!(result, Err(DiskError::DriverNotFound)));
}

#[test]
fn test_nul_head_is_never_classified() {
    // A head that happens to look like a floppy driver must be skipped.
    let fake_head = NodeLayout {
        flags: 0x0000,
        name: units(4),
        ..nul()
    };
    let memory = memory_with_chain(&[fake_head, hard_disk()]);
    let result = discover(&host(DOS_311), &memory, &default_locator(), &DiscoveryOptions::default());
    assert!(matches!(result, Err(DiskError::DriverNotFound)));
}

// ============================================================================
// Binder Tests
// ============================================================================

#[test]
fn test_bind_rejects_non_disk_successor() {
    let memory = memory_with_chain(&[nul(), floppy(), console()]);
    let result = discover(&host(DOS_311), &memory, &default_locator(), &DiscoveryOptions::default());
    match result {
        Err(DiskError::MisclassifiedDriver { flags, units, .. }) => {
            assert_eq!(flags, 0x8013);
            assert_eq!(units, b'C');
        }
        other => panic!("expected MisclassifiedDriver, got {:?}", other),
    }
}

#[test]
fn test_bind_rejects_three_unit_disk() {
    let node = DriverNode {
        address: FarPtr::new(0x0070, 0x0200),
        header: header(
            &NodeLayout {
                name: units(3),
                ..hard_disk()
            },
            FarPtr::new(0xFFFF, 0xFFFF),
        ),
    };
    let profile = HostProfile::from_version(DOS_311);
    assert!(matches!(
        bind(&node, &profile),
        Err(DiskError::MisclassifiedDriver { units: 3, .. })
    ));
}

// ============================================================================
// Context State Machine Tests
// ============================================================================

#[test]
fn test_context_binds_once() {
    let (host, memory) = scenario_a();
    let mut ctx = DiskContext::new(host, memory, ScriptedInvoker::new());
    assert_eq!(ctx.state(), &SubsystemState::Uninitialized);
    assert!(ctx.binding().is_none());

    let binding = ctx.initialize().unwrap();
    assert_eq!(ctx.state(), &SubsystemState::Bound(binding));
    assert_eq!(ctx.profile().unwrap().driver_segment(), 0x0070);
    assert_eq!(ctx.initialize().unwrap(), binding);
    assert!(ctx.initialize_disk_subsystem());
}

#[test]
fn test_failed_discovery_is_terminal() {
    let memory = memory_with_chain(&[nul(), floppy(), console()]);
    let mut invoker = ScriptedInvoker::new();
    let mut ctx = DiskContext::new(host(DOS_311), memory, &mut invoker);

    assert!(!ctx.initialize_disk_subsystem());
    assert!(matches!(ctx.state(), SubsystemState::Failed(_)));
    assert!(matches!(ctx.initialize(), Err(DiskError::SubsystemFailed(_))));

    let mut buf = [0u8; SECTOR_SIZE];
    assert!(matches!(
        ctx.read_sector(0, 0, 2, &mut buf),
        Err(DiskError::SubsystemFailed(_))
    ));
    assert!(!ctx.read_sector_ok(0, 0, 2, &mut buf));
    drop(ctx);
    assert!(invoker.far_calls().is_empty());
}

struct FixedLocator(FarPtr);

impl DriverLocator for FixedLocator {
    fn locate(
        &self,
        chain: &DriverChain<'_>,
        _head: DriverNode,
    ) -> Result<LocatedDriver, DiskError> {
        Ok(LocatedDriver {
            node: chain.read_node(self.0)?,
            via_fallback: false,
        })
    }
}

#[test]
fn test_context_accepts_custom_locator() {
    let mut memory = RealModeMemory::new();
    write_chain(&mut memory, head_address(DOS_311), &[nul()]);
    let disk_at = FarPtr::new(0x0070, 0x0800);
    write_header(&mut memory, disk_at, &hard_disk(), FarPtr::new(0xFFFF, 0xFFFF));

    let mut ctx = DiskContext::new(host(DOS_311), memory, ScriptedInvoker::new())
        .with_locator(Box::new(FixedLocator(disk_at)));
    let binding = ctx.initialize().unwrap();
    assert_eq!(binding.header_address, disk_at);
}
