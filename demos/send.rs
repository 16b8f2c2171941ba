/*!
 * Send a raw frame or a key
 *
 * ```text
 * cargo run --example send -- cec0 10:8f
 * cargo run --example send -- cec0 key TV Select
 * ```
 */

use cec_control::*;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cec = match args.first() {
        Some(adapter) => Session::open(adapter, "sender")?,
        None => {
            eprintln!("usage: send <adapter> <hex frame> | key <device> <key>");
            return Ok(());
        }
    };

    match &args[1..] {
        [cmd, device, key] if cmd == "key" => {
            let addr: LogicalAddress = device.parse()?;
            let key: Key = key.parse()?;
            cec.key_event(addr, &key)?;
            println!("{key:?} -> {addr}");
        }
        [hex] => {
            let frame: CecFrame = hex.parse()?;
            let acked = cec.transmit(&frame)?;
            println!("{frame} {}", if acked { "acknowledged" } else { "not acknowledged" });
        }
        _ => eprintln!("usage: send <adapter> <hex frame> | key <device> <key>"),
    }
    cec.destroy();
    Ok(())
}
