use super::header::{DeviceDriverHeader, HEADER_LEN};
use crate::address::FarPtr;
use crate::error::DiskError;
use crate::host::{HostProfile, HostServices};
use crate::memory::SystemMemory;
use tracing::debug;

/// A header together with the address it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverNode {
    pub address: FarPtr,
    pub header: DeviceDriverHeader,
}

/// Reader over the DOS device driver chain
pub struct DriverChain<'m> {
    memory: &'m dyn SystemMemory,
    max_len: usize,
}

impl<'m> DriverChain<'m> {
    pub fn new(memory: &'m dyn SystemMemory, max_len: usize) -> Self {
        Self { memory, max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn read_node(&self, address: FarPtr) -> Result<DriverNode, DiskError> {
        let mut raw = [0u8; HEADER_LEN];
        self.memory.read(address, &mut raw)?;
        let header = DeviceDriverHeader::decode(&raw);
        debug!("{} {}", address, header);
        Ok(DriverNode { address, header })
    }

    /// The NUL device header, located freshly from the host on every call
    pub fn first(
        &self,
        host: &dyn HostServices,
        profile: &HostProfile,
    ) -> Result<DriverNode, DiskError> {
        let head = host.list_of_lists()?.wrapping_add(profile.head_offset());
        self.read_node(head)
    }

    /// Follows the link of `node`, `None` once the chain terminates
    pub fn next(&self, node: &DriverNode) -> Result<Option<DriverNode>, DiskError> {
        if node.header.is_terminal() {
            return Ok(None);
        }
        self.read_node(node.header.next).map(Some)
    }

    /// Every node from `head` to the terminal one, inclusive
    pub fn walk(&self, head: DriverNode) -> ChainWalk<'_, 'm> {
        ChainWalk {
            chain: self,
            pending: Some(Ok(head)),
            visited: 0,
        }
    }
}

pub struct ChainWalk<'c, 'm> {
    chain: &'c DriverChain<'m>,
    pending: Option<Result<DriverNode, DiskError>>,
    visited: usize,
}

impl Iterator for ChainWalk<'_, '_> {
    type Item = Result<DriverNode, DiskError>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = match self.pending.take()? {
            Ok(node) => node,
            Err(e) => return Some(Err(e)),
        };

        if self.visited >= self.chain.max_len {
            return Some(Err(DiskError::ChainTooLong {
                limit: self.chain.max_len,
            }));
        }
        self.visited += 1;

        self.pending = self.chain.next(&node).transpose();
        Some(Ok(node))
    }
}
