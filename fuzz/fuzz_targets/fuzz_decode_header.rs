#![no_main]

use libfuzzer_sys::fuzz_target;
use rainbow_hd::driver::{is_four_unit_floppy, is_hard_disk_candidate, HEADER_LEN};
use rainbow_hd::request::{CommandBlock, RequestHeader, COMMAND_BLOCK_LEN, REQUEST_HEADER_LEN};
use rainbow_hd::DeviceDriverHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = <&[u8; HEADER_LEN]>::try_from(data.get(..HEADER_LEN).unwrap_or(&[])) {
        let header = DeviceDriverHeader::decode(raw);
        assert_eq!(&header.encode(), raw);
        let _ = header.to_string();
        assert!(!(is_four_unit_floppy(&header) && is_hard_disk_candidate(&header)));
    }
    if let Ok(raw) = <&[u8; REQUEST_HEADER_LEN]>::try_from(data.get(..REQUEST_HEADER_LEN).unwrap_or(&[])) {
        assert_eq!(&RequestHeader::decode(raw).encode(), raw);
    }
    if let Ok(raw) = <&[u8; COMMAND_BLOCK_LEN]>::try_from(data.get(..COMMAND_BLOCK_LEN).unwrap_or(&[])) {
        assert_eq!(&CommandBlock::decode(raw).encode(), raw);
    }
});
