//! A scripted driver for tests and dry runs.
//!
//! Clones share their state, so a test can keep one handle
//! while a [Session](crate::Session) owns another.
//!
//! ```
//! # use cec_control::{mock::{MockDevice, MockDriver}, Adapter, LogicalAddress, Session, SessionConfig};
//! let driver = MockDriver::new();
//! driver.add_adapter(Adapter::new("/dev/cec0", "mock"));
//! driver.add_device(LogicalAddress::TV, MockDevice::new("TV", 0x0000));
//!
//! let session = Session::open_with(driver.clone(), "cec0", "test", SessionConfig::default()).unwrap();
//! let devices = session.list_devices().unwrap();
//! assert_eq!(devices["TV"].physical_address, "0.0.0.0");
//! ```

use crate::driver::{Adapter, CecDriver, DeviceProfile, LogMessage, LogSink, Timeouts};
use crate::{CecError, CecFrame, LogicalAddress, Result};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a scripted device answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    pub osd_name: Option<String>,
    pub physical_address: u16,
    pub power_status: u8,
    pub vendor_id: u32,
    pub cec_version: u8,
    pub menu_language: Option<String>,
    pub active_source: bool,
}

impl MockDevice {
    /// A powered on CEC 1.4 device without vendor or language.
    pub fn new(osd_name: &str, physical_address: u16) -> Self {
        Self {
            osd_name: Some(osd_name.to_string()),
            physical_address,
            power_status: 0,
            vendor_id: 0,
            cec_version: 5,
            menu_language: None,
            active_source: false,
        }
    }
}

/// Requests that can be made to fail with [MockDriver::reject].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `initialize` errors with [CecError::InitFailed]
    Initialize,
    /// `open_adapter` errors with [CecError::OpenFailed]
    Open,
    /// every `query_*` errors with [CecError::CommandRejected]
    Query,
    // the rest answer `Ok(false)`, or error after [MockDriver::fail]
    Transmit,
    KeyPress,
    KeyRelease,
    PowerOn,
    Standby,
    VolumeUp,
    VolumeDown,
    Mute,
}

/// A request as the driver saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize(String),
    Enumerate(usize),
    Open(String),
    Transmit(CecFrame),
    Query(&'static str, LogicalAddress),
    KeyPress(LogicalAddress, u8),
    KeyRelease(LogicalAddress),
    PowerOn(LogicalAddress),
    Standby(LogicalAddress),
    VolumeUp,
    VolumeDown,
    Mute,
    Destroy,
}

fn unplugged() -> CecError {
    io::Error::new(io::ErrorKind::BrokenPipe, "mock adapter unplugged").into()
}

#[derive(Default)]
struct MockState {
    adapters: Vec<Adapter>,
    devices: BTreeMap<LogicalAddress, MockDevice>,
    rejected: HashSet<Op>,
    failing: HashSet<Op>,
    calls: Vec<Call>,
    sink: Option<Arc<dyn LogSink>>,
}

#[derive(Clone, Default)]
pub struct MockDriver(Arc<Mutex<MockState>>);

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn add_adapter(&self, adapter: Adapter) {
        self.state().adapters.push(adapter);
    }
    /// Make `addr` show up as active.
    pub fn add_device(&self, addr: LogicalAddress, device: MockDevice) {
        self.state().devices.insert(addr, device);
    }
    pub fn remove_device(&self, addr: LogicalAddress) {
        self.state().devices.remove(&addr);
    }
    /// Fail every following `op`.
    pub fn reject(&self, op: Op) {
        self.state().rejected.insert(op);
    }
    /// Make every following `op` error as if the adapter was unplugged.
    pub fn fail(&self, op: Op) {
        self.state().failing.insert(op);
    }
    /// Undo [reject](MockDriver::reject) and [fail](MockDriver::fail)
    pub fn accept(&self, op: Op) {
        let mut s = self.state();
        s.rejected.remove(&op);
        s.failing.remove(&op);
    }
    /// All requests so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
    /// Emit a driver log line, as a real driver would from its own thread.
    pub fn emit_log(&self, msg: LogMessage) {
        let sink = self.state().sink.clone();
        if let Some(sink) = sink {
            sink.log(msg);
        }
    }

    fn command(&mut self, call: Call, op: Op) -> Result<bool> {
        let mut s = self.state();
        s.calls.push(call);
        if s.failing.contains(&op) {
            return Err(unplugged());
        }
        Ok(!s.rejected.contains(&op))
    }
    fn query<T>(
        &mut self,
        what: &'static str,
        addr: LogicalAddress,
        answer: impl FnOnce(Option<&MockDevice>) -> T,
    ) -> Result<T> {
        let mut s = self.state();
        s.calls.push(Call::Query(what, addr));
        if s.failing.contains(&Op::Query) {
            return Err(unplugged());
        }
        if s.rejected.contains(&Op::Query) {
            return Err(CecError::CommandRejected("query"));
        }
        Ok(answer(s.devices.get(&addr)))
    }
}

impl CecDriver for MockDriver {
    fn initialize(&mut self, profile: &DeviceProfile, sink: Arc<dyn LogSink>) -> Result<()> {
        {
            let mut s = self.state();
            s.calls.push(Call::Initialize(profile.name().to_string()));
            if s.rejected.contains(&Op::Initialize) {
                return Err(CecError::InitFailed("mock rejects the profile".into()));
            }
            s.sink = Some(sink.clone());
        }
        // the sink may call back into the mock
        sink.log(LogMessage::new(
            log::Level::Info,
            format!("mock driver initialised as {}", profile.name()),
        ));
        Ok(())
    }

    fn enumerate_adapters(&mut self, max: usize) -> Result<Vec<Adapter>> {
        let mut s = self.state();
        s.calls.push(Call::Enumerate(max));
        Ok(s.adapters.iter().take(max).cloned().collect())
    }

    fn open_adapter(&mut self, adapter: &Adapter, _timeouts: Timeouts) -> Result<()> {
        {
            let mut s = self.state();
            s.calls.push(Call::Open(adapter.comm.clone()));
            if s.rejected.contains(&Op::Open) {
                return Err(CecError::OpenFailed {
                    comm: adapter.comm.clone(),
                    reason: "mock rejects the adapter".into(),
                });
            }
        }
        self.emit_log(LogMessage::new(log::Level::Info, format!("opened {}", adapter.comm)));
        Ok(())
    }

    fn transmit_frame(&mut self, frame: &CecFrame) -> Result<bool> {
        self.command(Call::Transmit(*frame), Op::Transmit)
    }

    fn query_active(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.query("active", addr, |d| d.is_some())
    }
    fn query_osd_name(&mut self, addr: LogicalAddress) -> Result<Option<String>> {
        self.query("osd_name", addr, |d| d.and_then(|d| d.osd_name.clone()))
    }
    fn query_physical_address(&mut self, addr: LogicalAddress) -> Result<u16> {
        self.query("physical_address", addr, |d| {
            d.map_or(0xffff, |d| d.physical_address)
        })
    }
    fn query_power_status(&mut self, addr: LogicalAddress) -> Result<u8> {
        self.query("power_status", addr, |d| d.map_or(0x99, |d| d.power_status))
    }
    fn query_vendor_id(&mut self, addr: LogicalAddress) -> Result<u32> {
        self.query("vendor_id", addr, |d| d.map_or(0, |d| d.vendor_id))
    }
    fn query_cec_version(&mut self, addr: LogicalAddress) -> Result<u8> {
        self.query("cec_version", addr, |d| d.map_or(0, |d| d.cec_version))
    }
    fn query_menu_language(&mut self, addr: LogicalAddress) -> Result<Option<String>> {
        self.query("menu_language", addr, |d| {
            d.and_then(|d| d.menu_language.clone())
        })
    }
    fn query_active_source(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.query("active_source", addr, |d| d.is_some_and(|d| d.active_source))
    }

    fn send_key_press(&mut self, addr: LogicalAddress, key: u8) -> Result<bool> {
        self.command(Call::KeyPress(addr, key), Op::KeyPress)
    }
    fn send_key_release(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.command(Call::KeyRelease(addr), Op::KeyRelease)
    }
    fn power_on_devices(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.command(Call::PowerOn(addr), Op::PowerOn)
    }
    fn standby_devices(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.command(Call::Standby(addr), Op::Standby)
    }
    fn volume_up(&mut self) -> Result<bool> {
        self.command(Call::VolumeUp, Op::VolumeUp)
    }
    fn volume_down(&mut self) -> Result<bool> {
        self.command(Call::VolumeDown, Op::VolumeDown)
    }
    fn mute_audio(&mut self) -> Result<bool> {
        self.command(Call::Mute, Op::Mute)
    }

    fn destroy(&mut self) {
        let mut s = self.state();
        s.calls.push(Call::Destroy);
        s.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let mock = MockDriver::new();
        let mut handle = mock.clone();
        handle.volume_up().unwrap();
        assert_eq!(mock.calls(), vec![Call::VolumeUp]);
        mock.clear_calls();
        assert!(handle.calls().is_empty());
    }

    #[test]
    fn rejected_commands_answer_false() {
        let mut mock = MockDriver::new();
        mock.reject(Op::Mute);
        assert!(!mock.mute_audio().unwrap());
        mock.accept(Op::Mute);
        assert!(mock.mute_audio().unwrap());
    }

    #[test]
    fn unknown_devices_answer_defaults() {
        let mut mock = MockDriver::new();
        let addr = LogicalAddress::PLAYBACK;
        assert!(!mock.query_active(addr).unwrap());
        assert_eq!(mock.query_physical_address(addr).unwrap(), 0xffff);
        assert_eq!(mock.query_osd_name(addr).unwrap(), None);
        mock.reject(Op::Query);
        assert!(mock.query_vendor_id(addr).is_err());
    }

    #[test]
    fn log_lines_reach_the_sink() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut mock = MockDriver::new();
        mock.initialize(&DeviceProfile::new("pi"), Arc::new(tx))
            .unwrap();
        mock.emit_log(LogMessage::new(log::Level::Warn, "lost arbitration"));
        let lines: Vec<_> = rx.try_iter().map(|m| m.message).collect();
        assert_eq!(lines, vec!["mock driver initialised as pi", "lost arbitration"]);

        mock.destroy();
        mock.emit_log(LogMessage::new(log::Level::Warn, "after destroy"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sink_may_inspect_the_mock() {
        let mut mock = MockDriver::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (inspect, store) = (mock.clone(), seen.clone());
        let sink = move |_: LogMessage| {
            store.lock().unwrap().push(inspect.calls().len());
        };
        mock.initialize(&DeviceProfile::new("pi"), Arc::new(sink))
            .unwrap();
        mock.open_adapter(&Adapter::new("/dev/cec0", "mock"), Timeouts::default())
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn failing_operations_error() {
        let mut mock = MockDriver::new();
        mock.fail(Op::KeyRelease);
        assert!(matches!(
            mock.send_key_release(LogicalAddress::TV),
            Err(CecError::Io(_))
        ));
        mock.fail(Op::Query);
        assert!(matches!(
            mock.query_active(LogicalAddress::TV),
            Err(CecError::Io(_))
        ));
        mock.accept(Op::KeyRelease);
        assert!(mock.send_key_release(LogicalAddress::TV).unwrap());
    }
}
