//! The adapter driver a [Session](crate::Session) runs on.
//!
//! A driver owns the link to the bus: it arbitrates, retries and acknowledges
//! frames and reports what it knows about other devices.
//! [LinuxDriver](crate::linux::LinuxDriver) uses the kernel CEC framework,
//! [MockDriver](crate::mock::MockDriver) is a scripted stand in.

use crate::{CecFrame, LogicalAddress, Result};
use std::{fmt, sync::Arc, time::Duration};

/// Maximum length of the name announced on the bus.
pub const MAX_DEVICE_NAME: usize = 12;

/// Device Type Operand
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum DeviceType {
    Tv,
    RecordingDevice,
    Tuner,
    PlaybackDevice,
    AudioSystem,
}

/// How this host presents itself on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    name: String,
    pub device_type: DeviceType,
}

impl DeviceProfile {
    /// A recording device called `name`, cut to [MAX_DEVICE_NAME] characters.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.chars().take(MAX_DEVICE_NAME).collect(),
            device_type: DeviceType::RecordingDevice,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An adapter as reported by [CecDriver::enumerate_adapters]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Adapter {
    /// where the adapter lives, e.g. `/dev/cec0`
    pub path: String,
    /// how the driver talks to it, e.g. the kernel driver or a serial port
    pub comm: String,
}

impl Adapter {
    pub fn new(path: impl Into<String>, comm: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            comm: comm.into(),
        }
    }
}

/// Timeouts handed to [CecDriver::open_adapter]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// until the adapter is usable
    pub connect: Duration,
    /// how long to wait for a device to answer a query
    pub reply: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            reply: Duration::from_secs(1),
        }
    }
}

/// A line of driver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: log::Level,
    pub message: String,
}

impl LogMessage {
    pub fn new(level: log::Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Receives driver log lines.
///
/// Called from whatever thread the driver happens to run on, at any time
/// between [CecDriver::initialize] and [CecDriver::destroy].
/// Implementations must return quickly and must not panic.
pub trait LogSink: Send + Sync {
    fn log(&self, msg: LogMessage);
}

impl<F> LogSink for F
where
    F: Fn(LogMessage) + Send + Sync,
{
    fn log(&self, msg: LogMessage) {
        self(msg)
    }
}

/// Queue lines for another thread. A hung up receiver drops them.
impl LogSink for std::sync::mpsc::Sender<LogMessage> {
    fn log(&self, msg: LogMessage) {
        let _ = self.send(msg);
    }
}

/// Hands driver lines to the [log] facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogForwarder;

impl LogSink for LogForwarder {
    fn log(&self, msg: LogMessage) {
        log::log!(target: "cec_control::driver", msg.level, "{}", msg.message);
    }
}

/// Drops everything above `max`
pub(crate) struct LevelFilterSink {
    pub(crate) inner: Arc<dyn LogSink>,
    pub(crate) max: log::LevelFilter,
}

impl LogSink for LevelFilterSink {
    fn log(&self, msg: LogMessage) {
        if msg.level <= self.max {
            self.inner.log(msg)
        }
    }
}

/**
 * The requests a [Session](crate::Session) makes to its adapter driver.
 *
 * Calls are serialized by the session, so implementations need no locking of their own.
 * Commands return `Ok(false)` when the driver ran them but the bus did not accept them,
 * and `Err` when the driver itself failed.
 */
pub trait CecDriver: Send {
    /// Register this host. `sink` stays valid until [CecDriver::destroy].
    fn initialize(&mut self, profile: &DeviceProfile, sink: Arc<dyn LogSink>) -> Result<()>;
    /// At most `max` adapters, in the driver's order.
    fn enumerate_adapters(&mut self, max: usize) -> Result<Vec<Adapter>>;
    fn open_adapter(&mut self, adapter: &Adapter, timeouts: Timeouts) -> Result<()>;
    /// Send a raw frame. The result is the acknowledgement.
    fn transmit_frame(&mut self, frame: &CecFrame) -> Result<bool>;

    fn query_active(&mut self, addr: LogicalAddress) -> Result<bool>;
    fn query_osd_name(&mut self, addr: LogicalAddress) -> Result<Option<String>>;
    fn query_physical_address(&mut self, addr: LogicalAddress) -> Result<u16>;
    /// raw Power Status Operand
    fn query_power_status(&mut self, addr: LogicalAddress) -> Result<u8>;
    /// 24 bit vendor ID
    fn query_vendor_id(&mut self, addr: LogicalAddress) -> Result<u32>;
    /// raw CEC Version Operand
    fn query_cec_version(&mut self, addr: LogicalAddress) -> Result<u8>;
    /// ISO 639-2 code like `"eng"`
    fn query_menu_language(&mut self, addr: LogicalAddress) -> Result<Option<String>>;
    fn query_active_source(&mut self, addr: LogicalAddress) -> Result<bool>;

    fn send_key_press(&mut self, addr: LogicalAddress, key: u8) -> Result<bool>;
    fn send_key_release(&mut self, addr: LogicalAddress) -> Result<bool>;
    fn power_on_devices(&mut self, addr: LogicalAddress) -> Result<bool>;
    fn standby_devices(&mut self, addr: LogicalAddress) -> Result<bool>;
    fn volume_up(&mut self) -> Result<bool>;
    fn volume_down(&mut self) -> Result<bool>;
    fn mute_audio(&mut self) -> Result<bool>;

    /// Release the adapter. Called at most once per initialize.
    fn destroy(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn profile_name_is_bounded() {
        let p = DeviceProfile::new("living room media center");
        assert_eq!(p.name(), "living room ");
        assert_eq!(p.device_type, DeviceType::RecordingDevice);
        assert_eq!(DeviceProfile::new("pi4").name(), "pi4");
    }

    #[test]
    fn filter_drops_verbose_lines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = seen.clone();
        let sink = LevelFilterSink {
            inner: Arc::new(move |m: LogMessage| store.lock().unwrap().push(m.message)),
            max: log::LevelFilter::Info,
        };
        sink.log(LogMessage::new(log::Level::Debug, "frame >> 10:8f"));
        sink.log(LogMessage::new(log::Level::Warn, "bus busy"));
        assert_eq!(*seen.lock().unwrap(), vec!["bus busy".to_string()]);
    }

    #[test]
    fn channel_sink_survives_hang_up() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.log(LogMessage::new(log::Level::Info, "opened"));
        assert_eq!(rx.recv().unwrap().message, "opened");
        drop(rx);
        tx.log(LogMessage::new(log::Level::Info, "nobody listens"));
    }
}
