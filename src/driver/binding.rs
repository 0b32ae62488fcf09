use super::chain::DriverNode;
use super::classify::is_hard_disk_candidate;
use crate::address::FarPtr;
use crate::error::DiskError;
use crate::host::HostProfile;
use serde::Serialize;
use tracing::{error, info};

/// Entry points of the bound hard disk driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverBinding {
    /// Where the driver's header was read from
    pub header_address: FarPtr,
    pub strategy: FarPtr,
    pub interrupt: FarPtr,
}

/// Resolves the entry points of `node` after re-checking that it looks like
/// the Winchester driver
pub fn bind(node: &DriverNode, profile: &HostProfile) -> Result<DriverBinding, DiskError> {
    let header = &node.header;
    if !is_hard_disk_candidate(header) {
        error!("Found something that's not a hard disk driver at {}", node.address);
        return Err(DiskError::MisclassifiedDriver {
            address: node.address,
            flags: header.flags,
            units: header.unit_count(),
        });
    }

    let segment = profile.driver_segment();
    let binding = DriverBinding {
        header_address: node.address,
        strategy: FarPtr::new(segment, header.strategy_offset),
        interrupt: FarPtr::new(segment, header.interrupt_offset),
    };
    info!(
        "HD Driver Strategy: [{}] Interrupt: [{}]",
        binding.strategy, binding.interrupt
    );
    Ok(binding)
}
