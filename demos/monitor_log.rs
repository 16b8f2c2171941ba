/*!
 * Print the driver output while polling the bus every few seconds
 */

use std::{sync::mpsc, thread::sleep, time::Duration};

use cec_control::*;

fn main() -> Result<()> {
    let adapter = std::env::args().nth(1).unwrap_or_default();
    let (tx, rx) = mpsc::channel::<LogMessage>();
    let config = SessionConfig::default()
        .log_level(log::LevelFilter::Trace)
        .log_sink(tx);
    let cec = Session::open_with(linux::LinuxDriver::new(), &adapter, "monitor", config)?;

    loop {
        for msg in rx.try_iter() {
            println!("{msg}");
        }
        let active = cec.active_devices()?;
        println!("active: {active:?}");
        sleep(Duration::from_secs(5));
    }
}
