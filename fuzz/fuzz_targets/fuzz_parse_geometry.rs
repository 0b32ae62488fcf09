#![no_main]

use libfuzzer_sys::fuzz_target;
use rainbow_hd::parse_geometry;

fuzz_target!(|data: &[u8]| {
    if let Ok(geometry) = parse_geometry(data) {
        assert_eq!(&data[0..3], b"HOM");
        let _ = geometry.total_sectors();
        if let Some(last) = geometry.total_sectors().checked_sub(1) {
            let chs = geometry.chs(last).unwrap();
            assert_eq!(geometry.lba(chs), Some(last));
        }
    }
});
