#![no_main]

use libfuzzer_sys::fuzz_target;
use rainbow_hd::driver::{discover, FloppySuccessorLocator};
use rainbow_hd::{DiscoveryOptions, DosVersion, FarPtr, RealModeMemory, StaticHost};

// Arbitrary bytes as low memory, list of lists at 0000:0000.
fuzz_target!(|data: &[u8]| {
    let memory = RealModeMemory::from_bytes(data.to_vec());
    let host = StaticHost::new(DosVersion::new(3, 11, 0), FarPtr::new(0, 0));
    let options = DiscoveryOptions::default().with_max_chain_len(32);
    let locator = FloppySuccessorLocator::from_options(&options);
    let _ = discover(&host, &memory, &locator, &options);
});
