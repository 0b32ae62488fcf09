//! Hard disk access for the DEC Rainbow 100 under MS-DOS
//!
//! The Rainbow's MS-DOS does not offer a working raw disk call, so this
//! crate finds the resident Winchester driver in the DOS device chain,
//! binds its entry points and issues single-sector reads in the driver's
//! own request format. Host access sits behind traits so the same logic
//! runs against memory dumps and scripted drivers off the machine.

pub mod address;
pub mod context;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod host;
pub mod invoker;
pub mod memory;
pub mod options;
pub mod request;
pub mod sector;

#[cfg(all(feature = "dpmi", target_arch = "x86"))]
pub mod dpmi;

pub use address::FarPtr;
pub use context::{DiskContext, SubsystemState};
pub use driver::{DeviceDriverHeader, DriverBinding, DriverChain, DriverNode};
pub use error::DiskError;
pub use geometry::{parse_geometry, parse_geometry_into, Chs, DiskGeometry, HomeBlock, SECTOR_SIZE};
pub use host::{DosVersion, HostProfile, HostServices, StaticHost};
pub use invoker::{DriverInvoker, ScriptedInvoker, ScriptedResponse};
pub use memory::{RealModeMemory, SystemMemory};
pub use options::DiscoveryOptions;
