use crate::driver::DriverBinding;
use crate::error::DiskError;
use crate::geometry::{Chs, SECTOR_SIZE};
use crate::invoker::{DriverInvoker, BUFFER_OFFSET, COMMAND_OFFSET, REQUEST_OFFSET};
use crate::request::{CommandBlock, RequestHeader, COMMAND_BLOCK_LEN, MAX_HEAD, STATUS_OK};
use tracing::{trace, warn};

pub fn validate(chs: Chs) -> Result<(), DiskError> {
    if chs.sector == 0 || chs.head > MAX_HEAD {
        return Err(DiskError::InvalidAddress {
            cylinder: chs.cylinder,
            head: chs.head,
            sector: chs.sector,
        });
    }
    Ok(())
}

/// Reads one sector through the bound driver
///
/// Both structures and the sector buffer live in the invoker's transfer
/// area; every pointer handed to the driver is built from its real-mode
/// address. Strategy runs before interrupt, both with ES:BX at the request.
pub fn read_sector<I: DriverInvoker + ?Sized>(
    invoker: &mut I,
    binding: &DriverBinding,
    chs: Chs,
    dest: &mut [u8; SECTOR_SIZE],
) -> Result<(), DiskError> {
    validate(chs)?;

    let area = invoker.transfer_area();
    let request_at = area.wrapping_add(REQUEST_OFFSET);
    let command_at = area.wrapping_add(COMMAND_OFFSET);
    let buffer_at = area.wrapping_add(BUFFER_OFFSET);

    invoker.store(COMMAND_OFFSET, &CommandBlock::read(chs, buffer_at).encode())?;
    invoker.store(REQUEST_OFFSET, &RequestHeader::read(command_at).encode())?;

    trace!("Reading {} via {}, request at {}", chs, binding.strategy, request_at);
    invoker.far_call(binding.strategy, request_at)?;
    invoker.far_call(binding.interrupt, request_at)?;

    let mut raw = [0u8; COMMAND_BLOCK_LEN];
    invoker.load(COMMAND_OFFSET, &mut raw)?;
    let done = CommandBlock::decode(&raw);
    if done.status != STATUS_OK {
        warn!("Error {:02X} {:02X} reading {}", done.status, done.error, chs);
        return Err(DiskError::Io {
            status: done.status,
            error: done.error,
        });
    }
    invoker.load(BUFFER_OFFSET, dest)
}
