use crate::driver::{CecDriver, DeviceProfile, LevelFilterSink, LogForwarder, LogSink, Timeouts};
use crate::registry::Key;
use crate::snapshot::{self, DeviceState};
use crate::{codec, locator, CecError, CecFrame, LogicalAddress, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::{fmt, thread, time::Duration};

/// Where a [Session] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// the driver accepted the profile
    Initialized,
    /// an adapter is open, commands can be sent
    Opened,
    Destroyed,
}

/// Knobs for [Session::open_with]
#[derive(Clone)]
pub struct SessionConfig {
    pub timeouts: Timeouts,
    /// How long a key is held down in [Session::key_event]
    pub key_hold: Duration,
    /// Driver lines more verbose than this are dropped
    pub log_level: log::LevelFilter,
    /// Receives driver lines. Defaults to the [log] facade.
    pub log_sink: Arc<dyn LogSink>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            key_hold: Duration::from_millis(10),
            log_level: log::LevelFilter::Info,
            log_sink: Arc::new(LogForwarder),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.reply = timeout;
        self
    }
    pub fn key_hold(mut self, hold: Duration) -> Self {
        self.key_hold = hold;
        self
    }
    pub fn log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = level;
        self
    }
    pub fn log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sink = Arc::new(sink);
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("timeouts", &self.timeouts)
            .field("key_hold", &self.key_hold)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

struct Inner {
    driver: Box<dyn CecDriver>,
    state: SessionState,
}

/**
 * An open connection to one CEC adapter.
 *
 * All operations go through an internal lock, one at a time,
 * because the bus link can not multiplex requests.
 * The session can be shared between threads (e.g. in an `Arc`).
 *
 * ```no_run
 * # use cec_control::{Key, LogicalAddress, Session};
 * # fn main() -> cec_control::Result<()> {
 * let cec = Session::open("cec0", "pi4")?;
 * cec.power_on(LogicalAddress::TV)?;
 * cec.key_event(LogicalAddress::TV, &"Select".into())?;
 * for (role, device) in cec.list_devices()? {
 *     println!("{role}: {} {}", device.osd_name, device.power_status);
 * }
 * cec.destroy();
 * # Ok(())
 * # }
 * ```
 */
pub struct Session {
    inner: Mutex<Inner>,
    key_hold: Duration,
}

impl Session {
    /// Open the first kernel CEC adapter whose path or driver name contains `adapter`,
    /// announcing this host as `device_name`.
    #[cfg(target_os = "linux")]
    pub fn open(adapter: &str, device_name: &str) -> Result<Self> {
        Self::open_with(
            crate::linux::LinuxDriver::new(),
            adapter,
            device_name,
            SessionConfig::default(),
        )
    }

    /// Open a session on any driver.
    ///
    /// On failure everything the driver allocated so far is released again.
    pub fn open_with<D: CecDriver + 'static>(
        driver: D,
        adapter: &str,
        device_name: &str,
        config: SessionConfig,
    ) -> Result<Self> {
        let mut inner = Inner {
            driver: Box::new(driver),
            state: SessionState::Uninitialized,
        };
        let profile = DeviceProfile::new(device_name);
        let sink = Arc::new(LevelFilterSink {
            inner: config.log_sink.clone(),
            max: config.log_level,
        });
        inner.driver.initialize(&profile, sink)?;
        inner.state = SessionState::Initialized;

        let opened = locator::find_matching(&mut *inner.driver, adapter).and_then(|a| {
            log::info!("opening {} ({})", a.path, a.comm);
            inner.driver.open_adapter(&a, config.timeouts)
        });
        if let Err(e) = opened {
            log::warn!("open failed: {e}");
            inner.driver.destroy();
            return Err(e);
        }
        inner.state = SessionState::Opened;
        Ok(Self {
            inner: Mutex::new(inner),
            key_hold: config.key_hold,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// run `f` on the driver if the session is open
    fn with_driver<T>(&self, f: impl FnOnce(&mut dyn CecDriver) -> Result<T>) -> Result<T> {
        let mut inner = self.lock();
        if inner.state != SessionState::Opened {
            return Err(CecError::NotOpen);
        }
        f(&mut *inner.driver)
    }

    fn command(
        &self,
        what: &'static str,
        f: impl FnOnce(&mut dyn CecDriver) -> Result<bool>,
    ) -> Result<()> {
        log::debug!("{what}");
        if self.with_driver(f)? {
            Ok(())
        } else {
            Err(CecError::CommandRejected(what))
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Wake `addr` (or all devices via [LogicalAddress::BROADCAST]) from standby
    pub fn power_on(&self, addr: LogicalAddress) -> Result<()> {
        self.command("power on", |d| d.power_on_devices(addr))
    }
    pub fn standby(&self, addr: LogicalAddress) -> Result<()> {
        self.command("standby", |d| d.standby_devices(addr))
    }
    pub fn volume_up(&self) -> Result<()> {
        self.command("volume up", |d| d.volume_up())
    }
    pub fn volume_down(&self) -> Result<()> {
        self.command("volume down", |d| d.volume_down())
    }
    /// toggle mute on the audio system
    pub fn mute(&self) -> Result<()> {
        self.command("mute", |d| d.mute_audio())
    }
    pub fn key_press(&self, addr: LogicalAddress, key: &Key) -> Result<()> {
        let code = key.resolve()?;
        self.command("key press", |d| d.send_key_press(addr, code))
    }
    pub fn key_release(&self, addr: LogicalAddress) -> Result<()> {
        self.command("key release", |d| d.send_key_release(addr))
    }

    /**
     * Press `key` on `addr`, hold it for the configured time (10ms) and release it.
     *
     * If the press fails nothing is released.
     * If the release fails the press has already reached the device
     * and the error names the release.
     */
    pub fn key_event(&self, addr: LogicalAddress, key: &Key) -> Result<()> {
        let code = key.resolve()?;
        let mut inner = self.lock();
        if inner.state != SessionState::Opened {
            return Err(CecError::NotOpen);
        }
        log::debug!("key event {code:#04x} to {addr}");
        if !inner.driver.send_key_press(addr, code)? {
            return Err(CecError::CommandRejected("key press"));
        }
        // keep the lock: nothing else may go on the bus between press and release
        thread::sleep(self.key_hold);
        match inner.driver.send_key_release(addr) {
            Ok(true) => Ok(()),
            Ok(false) => {
                log::warn!("key {code:#04x} pressed on {addr} but not released");
                Err(CecError::CommandRejected("key release"))
            }
            Err(e) => {
                log::warn!("key {code:#04x} pressed on {addr} but not released");
                Err(e)
            }
        }
    }

    /// Send a raw frame. Returns whether the bus acknowledged it.
    pub fn transmit(&self, frame: &CecFrame) -> Result<bool> {
        log::debug!("transmit {frame}");
        self.with_driver(|d| d.transmit_frame(frame))
    }
    /// Parse `hex` (see [codec::encode]) and [transmit](Session::transmit) it
    pub fn transmit_hex(&self, hex: &str) -> Result<bool> {
        let frame = codec::encode(hex)?;
        self.transmit(&frame)
    }

    pub fn is_active(&self, addr: LogicalAddress) -> Result<bool> {
        self.with_driver(|d| d.query_active(addr))
    }
    /// All logical addresses a device answers on
    pub fn active_devices(&self) -> Result<Vec<LogicalAddress>> {
        let mut active = Vec::new();
        for addr in LogicalAddress::all() {
            if self.is_active(addr)? {
                active.push(addr);
            }
        }
        Ok(active)
    }
    pub fn osd_name(&self, addr: LogicalAddress) -> Result<Option<String>> {
        self.with_driver(|d| d.query_osd_name(addr))
    }
    /// formatted as `a.b.c.d`
    pub fn physical_address(&self, addr: LogicalAddress) -> Result<String> {
        self.with_driver(|d| d.query_physical_address(addr))
            .map(codec::decode_physical_address)
    }
    /// one of `on`, `standby`, `starting`, `shutting down` or `""`
    pub fn power_status(&self, addr: LogicalAddress) -> Result<&'static str> {
        self.with_driver(|d| d.query_power_status(addr))
            .map(codec::decode_power_status)
    }
    pub fn vendor_id(&self, addr: LogicalAddress) -> Result<u32> {
        self.with_driver(|d| d.query_vendor_id(addr))
    }
    /// e.g. `1.4`, `""` if unknown
    pub fn cec_version(&self, addr: LogicalAddress) -> Result<&'static str> {
        self.with_driver(|d| d.query_cec_version(addr))
            .map(codec::decode_cec_version)
    }
    pub fn menu_language(&self, addr: LogicalAddress) -> Result<Option<String>> {
        self.with_driver(|d| d.query_menu_language(addr))
    }
    pub fn is_active_source(&self, addr: LogicalAddress) -> Result<bool> {
        self.with_driver(|d| d.query_active_source(addr))
    }

    /// See [snapshot::list_devices]
    pub fn list_devices(&self) -> Result<BTreeMap<&'static str, DeviceState>> {
        snapshot::list_devices(self)
    }

    /// Release the adapter. Calling it again does nothing.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        if matches!(
            inner.state,
            SessionState::Opened | SessionState::Initialized
        ) {
            inner.driver.destroy();
            inner.state = SessionState::Destroyed;
            log::debug!("session destroyed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destroy();
    }
}
