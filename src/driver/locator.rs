use super::chain::{DriverChain, DriverNode};
use super::classify::is_four_unit_floppy;
use crate::error::DiskError;
use crate::options::DiscoveryOptions;
use tracing::{info, warn};

/// Outcome of a locator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedDriver {
    pub node: DriverNode,
    /// Set when the node was found by guessing its address, not by a link
    pub via_fallback: bool,
}

/// Strategy for picking the hard disk driver out of the chain
pub trait DriverLocator {
    fn locate(
        &self,
        chain: &DriverChain<'_>,
        head: DriverNode,
    ) -> Result<LocatedDriver, DiskError>;
}

/// Picks the header following the RX50 floppy driver
///
/// On the Rainbow the Winchester driver is installed right after the
/// four-unit floppy driver. When the disk carries no MS-DOS partition the
/// chain stops at the floppy driver; the Winchester header is then assumed
/// to sit directly behind it in memory. That guess is specific to the
/// BIOS revisions seen so far and is reported every time it is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloppySuccessorLocator {
    pub fallback_offset: u16,
    pub allow_fallback: bool,
}

impl FloppySuccessorLocator {
    pub fn from_options(options: &DiscoveryOptions) -> Self {
        Self {
            fallback_offset: options.fallback_offset,
            allow_fallback: options.allow_fallback,
        }
    }

    fn successor(
        &self,
        chain: &DriverChain<'_>,
        floppy: &DriverNode,
    ) -> Result<LocatedDriver, DiskError> {
        if let Some(node) = chain.next(floppy)? {
            info!("Encountered a floppy drive, assuming next one is hard drive");
            return Ok(LocatedDriver {
                node,
                via_fallback: false,
            });
        }

        if !self.allow_fallback {
            warn!(
                "Floppy driver at {} ends the chain and fallback is disabled",
                floppy.address
            );
            return Err(DiskError::DriverNotFound);
        }

        let guess = floppy.address.wrapping_add(self.fallback_offset);
        warn!(
            "At the end of chain [{:04X}], picking next driver at {} (+{} bytes, unverified)",
            floppy.header.next.offset, guess, self.fallback_offset
        );
        Ok(LocatedDriver {
            node: chain.read_node(guess)?,
            via_fallback: true,
        })
    }
}

impl Default for FloppySuccessorLocator {
    fn default() -> Self {
        Self::from_options(&DiscoveryOptions::default())
    }
}

impl DriverLocator for FloppySuccessorLocator {
    fn locate(
        &self,
        chain: &DriverChain<'_>,
        head: DriverNode,
    ) -> Result<LocatedDriver, DiskError> {
        let mut nodes = chain.walk(head);
        // The NUL device at the head is never a disk driver, but a walk
        // that cannot even yield it must still fail.
        nodes.next().transpose()?;
        for node in nodes {
            let node = node?;
            if is_four_unit_floppy(&node.header) {
                return self.successor(chain, &node);
            }
        }
        Err(DiskError::DriverNotFound)
    }
}
