// cargo run -p veilfilt --example shadow_demo
use veilfilt::DEFAULT_BLOCK_SIZE;
use veilfilt::prelude::*;
use veilio::prelude::*;
use veiltrack::prelude::*;

fn main() {
    let bs = DEFAULT_BLOCK_SIZE;
    let total_blocks = 2048u64; // 1 MiB device
    let mut buf = vec![0u8; (total_blocks * bs as u64) as usize];
    let mut io = MemVeilIO::new(&mut buf);

    // Fill the protected region with a recognizable pattern
    for block in 0..1024u64 {
        io.write_at(block * bs as u64, &[0x11; 512]).expect("fill failed");
    }

    // The upper half of the device is spare capacity
    let pool = StoragePool::new(vec![Extent::new(1024, 1024)])
        .expect("bad pool")
        .with_label("upper-half");

    let tracker = Tracker::new(pool);
    let mut filter = ShadowFilter::new(&mut io, tracker, bs)
        .expect("bad filter")
        .with_low_space_watermark(10);
    filter.start_tracking(false);

    // Overwrite a few ranges through the filter
    filter.write(100 * bs as u64, &[0x22; 512 * 8]).expect("write failed");
    filter.write(104 * bs as u64, &[0x33; 512 * 2]).expect("write failed");

    // Reads merge redirected and original blocks
    let mut out = vec![0u8; 512 * 12];
    filter.read(98 * bs as u64, &mut out).expect("read failed");
    println!(
        "block 98: {:#04x}, block 100: {:#04x}, block 104: {:#04x}, block 110: {:#04x}",
        out[0],
        out[2 * 512],
        out[6 * 512],
        out[512 * 12 - 1],
    );

    let info = filter.info();
    println!(
        "tracking: {}, redirected: {}, capacity: {}/{} free",
        info.tracking, info.remapped_blocks, info.free_blocks, info.total_blocks
    );

    for remap in filter.tracker().all_remaps().expect("no remaps") {
        println!("  {remap}");
    }

    let merged = filter.stop_merge().expect("merge failed");
    println!("merged {merged} blocks back into place");
}
