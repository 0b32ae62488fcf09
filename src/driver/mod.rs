//! Hard disk driver discovery
//!
//! Walks the DOS device driver chain, picks out the Winchester driver and
//! resolves its strategy and interrupt entry points.

mod binding;
mod chain;
mod classify;
mod header;
mod locator;

pub use binding::{bind, DriverBinding};
pub use chain::{ChainWalk, DriverChain, DriverNode};
pub use classify::{
    is_four_unit_floppy, is_hard_disk_candidate, FLOPPY_UNITS, HARD_DISK_FLAGS,
    HARD_DISK_FLAG_MASK, MAX_HARD_DISK_UNITS,
};
pub use header::{DeviceDriverHeader, FLAG_NAMED, HEADER_LEN};
pub use locator::{DriverLocator, FloppySuccessorLocator, LocatedDriver};

use crate::error::DiskError;
use crate::host::{self, HostProfile, HostServices};
use crate::memory::SystemMemory;
use crate::options::DiscoveryOptions;

/// Everything learned during a successful discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    pub profile: HostProfile,
    pub located: LocatedDriver,
    pub binding: DriverBinding,
}

/// Probes the host, walks the chain, and binds the hard disk driver
pub fn discover(
    host: &dyn HostServices,
    memory: &dyn SystemMemory,
    locator: &dyn DriverLocator,
    options: &DiscoveryOptions,
) -> Result<Discovery, DiskError> {
    let profile = host::detect_profile(host);
    let chain = DriverChain::new(memory, options.max_chain_len);
    let head = chain.first(host, &profile)?;
    let located = locator.locate(&chain, head)?;
    let binding = bind(&located.node, &profile)?;
    Ok(Discovery {
        profile,
        located,
        binding,
    })
}
