#![cfg_attr(docsrs, feature(doc_cfg))]
/*!
 * Control HDMI-CEC devices in pure rust.
 *
 * A [Session] picks an adapter by a fragment of its path or driver name,
 * announces this host on the bus and then sends commands and queries
 * through a [CecDriver]. On Linux that is the kernel CEC framework
 * ([linux::LinuxDriver]), for tests there is [mock::MockDriver].
 *
 * ```no_run
 * # use cec_control::{LogicalAddress, Session};
 * # fn main() -> cec_control::Result<()> {
 * let cec = Session::open("cec0", "media pc")?;
 * cec.power_on(LogicalAddress::TV)?;
 * cec.transmit_hex("1f:82:21:00")?;
 * println!("{:?}", cec.list_devices()?);
 * # Ok(())
 * # }
 * ```
 *
 * Logical addresses, vendors and user control keys can be looked up by name
 * in the [registry], frames are written and read as colon separated hex by the [codec].
 */
mod error;

pub mod codec;
pub mod driver;
pub mod locator;
pub mod mock;
pub mod registry;
pub mod session;
pub mod snapshot;

#[cfg(target_os = "linux")]
#[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
pub mod linux;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod tokio;

pub use codec::{CecFrame, CecVersion, PowerStatus};
pub use driver::{
    Adapter, CecDriver, DeviceProfile, DeviceType, LogForwarder, LogMessage, LogSink, Timeouts,
};
pub use error::{CecError, Result};
pub use registry::{Key, LogicalAddress};
pub use session::{Session, SessionConfig, SessionState};
pub use snapshot::DeviceState;
