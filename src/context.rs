//! Disk subsystem state
//!
//! `DiskContext` owns the process-wide disk state: the host handles, the
//! invoker, the bound driver and the geometry. Discovery runs at most once;
//! a failure is final for the life of the context.

use crate::driver::{self, DriverBinding, DriverLocator, FloppySuccessorLocator};
use crate::error::DiskError;
use crate::geometry::{parse_geometry, Chs, DiskGeometry, HOM_LOCATION, SECTOR_SIZE};
use crate::host::{HostProfile, HostServices};
use crate::invoker::DriverInvoker;
use crate::memory::SystemMemory;
use crate::options::DiscoveryOptions;
use crate::sector as sector_io;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsystemState {
    Uninitialized,
    Bound(DriverBinding),
    Failed(String),
}

pub struct DiskContext<H, M, I> {
    host: H,
    memory: M,
    invoker: I,
    locator: Box<dyn DriverLocator>,
    options: DiscoveryOptions,
    state: SubsystemState,
    profile: Option<HostProfile>,
    geometry: Option<DiskGeometry>,
}

impl<H, M, I> DiskContext<H, M, I>
where
    H: HostServices,
    M: SystemMemory,
    I: DriverInvoker,
{
    pub fn new(host: H, memory: M, invoker: I) -> Self {
        Self::with_options(host, memory, invoker, DiscoveryOptions::default())
    }

    pub fn with_options(host: H, memory: M, invoker: I, options: DiscoveryOptions) -> Self {
        Self {
            host,
            memory,
            invoker,
            locator: Box::new(FloppySuccessorLocator::from_options(&options)),
            options,
            state: SubsystemState::Uninitialized,
            profile: None,
            geometry: None,
        }
    }

    /// Replaces the strategy used to find the hard disk header
    pub fn with_locator(mut self, locator: Box<dyn DriverLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn state(&self) -> &SubsystemState {
        &self.state
    }

    pub fn binding(&self) -> Option<&DriverBinding> {
        match &self.state {
            SubsystemState::Bound(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&HostProfile> {
        self.profile.as_ref()
    }

    pub fn geometry(&self) -> Option<&DiskGeometry> {
        self.geometry.as_ref()
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Finds and binds the hard disk driver, once
    ///
    /// Later calls return the existing binding, or the first failure
    /// without walking the chain again.
    pub fn initialize(&mut self) -> Result<DriverBinding, DiskError> {
        match &self.state {
            SubsystemState::Bound(binding) => return Ok(*binding),
            SubsystemState::Failed(reason) => {
                return Err(DiskError::SubsystemFailed(reason.clone()));
            }
            SubsystemState::Uninitialized => {}
        }

        match driver::discover(
            &self.host,
            &self.memory,
            self.locator.as_ref(),
            &self.options,
        ) {
            Ok(found) => {
                if found.located.via_fallback {
                    info!(
                        "Hard disk driver bound from a guessed header at {}",
                        found.binding.header_address
                    );
                }
                self.profile = Some(found.profile);
                self.state = SubsystemState::Bound(found.binding);
                Ok(found.binding)
            }
            Err(e) => {
                error!("Hard disk initialization failed: {}", e);
                self.state = SubsystemState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Boolean form of [`DiskContext::initialize`]
    pub fn initialize_disk_subsystem(&mut self) -> bool {
        self.initialize().is_ok()
    }

    /// Reads one 512-byte sector; `sector` is 1-based
    pub fn read_sector(
        &mut self,
        cylinder: u16,
        head: u8,
        sector: u8,
        dest: &mut [u8; SECTOR_SIZE],
    ) -> Result<(), DiskError> {
        let binding = match &self.state {
            SubsystemState::Bound(binding) => *binding,
            SubsystemState::Uninitialized => return Err(DiskError::NotBound),
            SubsystemState::Failed(reason) => {
                return Err(DiskError::SubsystemFailed(reason.clone()));
            }
        };
        sector_io::read_sector(
            &mut self.invoker,
            &binding,
            Chs::new(cylinder, head, sector),
            dest,
        )
    }

    pub fn read_chs(&mut self, chs: Chs, dest: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        self.read_sector(chs.cylinder, chs.head, chs.sector, dest)
    }

    /// Boolean form of [`DiskContext::read_sector`]
    pub fn read_sector_ok(
        &mut self,
        cylinder: u16,
        head: u8,
        sector: u8,
        dest: &mut [u8; SECTOR_SIZE],
    ) -> bool {
        self.read_sector(cylinder, head, sector, dest).is_ok()
    }

    /// Parses an already fetched HOM sector and keeps the geometry
    pub fn set_geometry_from(&mut self, hom: &[u8]) -> Result<&DiskGeometry, DiskError> {
        let geometry = parse_geometry(hom)?;
        info!("Disk geometry {}", geometry);
        Ok(self.geometry.insert(geometry))
    }

    /// Reads the HOM block from disk and keeps the geometry it describes
    pub fn load_geometry(&mut self) -> Result<&DiskGeometry, DiskError> {
        let mut hom = [0u8; SECTOR_SIZE];
        self.read_chs(HOM_LOCATION, &mut hom)?;
        self.set_geometry_from(&hom)
    }
}
