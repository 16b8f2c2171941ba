/*!
 * List what is on the bus
 *
 * `cargo run --example list_devices -- cec0`
 */

use cec_control::*;

fn main() -> Result<()> {
    let adapter = std::env::args().nth(1).unwrap_or_default();
    let cec = Session::open(&adapter, "lister")?;

    for (role, dev) in cec.list_devices()? {
        println!(
            "{role:<14} {:<2} {:<14} {:<10} {:<8} {:<13} CEC {:<3} {}{}",
            dev.logical_address.value(),
            dev.osd_name,
            dev.vendor,
            dev.physical_address,
            dev.power_status,
            dev.cec_version,
            dev.language.as_deref().unwrap_or("-"),
            if dev.active_source { " (active source)" } else { "" },
        );
    }
    cec.destroy();
    Ok(())
}
