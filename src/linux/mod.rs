/*!
 * [CecDriver] on top of the [CEC linux API](https://www.kernel.org/doc/html/latest/userspace-api/media/cec/cec-api.html).
 *
 * Adapters are the `/dev/cecN` nodes. The kernel takes care of arbitration,
 * retries and acknowledging, this driver claims a logical address and
 * turns queries into a request frame plus the awaited reply opcode.
 *
 * ```no_run
 * # use cec_control::{linux::LinuxDriver, Session, SessionConfig};
 * # fn main() -> cec_control::Result<()> {
 * let session = Session::open_with(LinuxDriver::new(), "vc4", "pi", SessionConfig::default())?;
 * for (role, dev) in session.list_devices()? {
 *     println!("{role}: {} {}", dev.osd_name, dev.physical_address);
 * }
 * # Ok(())
 * # }
 * ```
 */
mod sys;

use crate::driver::{Adapter, CecDriver, DeviceProfile, DeviceType, LogMessage, LogSink, Timeouts};
use crate::{CecError, CecFrame, LogicalAddress, Result};
use log::Level;
use std::{
    io,
    mem::MaybeUninit,
    os::fd::AsRawFd,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use sys::{
    capabilities, get_log, get_phys, receive, set_log, set_mode, transmit, CecLogAddrFlags,
    CecLogAddrType, CecPrimDevType, CEC_PHYS_ADDR_INVALID, CEC_VENDOR_ID_NONE,
};
pub use sys::{
    Capabilities, CecCaps, CecLogAddrs, CecModeFollower, CecModeInitiator, CecMsg, CecOpcode,
    OSDStr,
};

/// user control code of the power button
const KEY_POWER: u8 = 0x40;
const KEY_VOLUME_UP: u8 = 0x41;
const KEY_VOLUME_DOWN: u8 = 0x42;
const KEY_MUTE: u8 = 0x43;
/// CEC version 1.4, announced when claiming an address
const CEC_VERSION_1_4: u8 = 5;

/// A handle on a CEC device node.
pub struct CecDevice(std::fs::File);

impl CecDevice {
    /// Open a CEC device. Typically `/dev/cecX`
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(Self)
    }
    /// query information on the devices capabilities. See [CecCaps]
    pub fn get_capas(&self) -> io::Result<CecCaps> {
        let mut capas = MaybeUninit::uninit();
        unsafe { capabilities(self.0.as_raw_fd(), capas.as_mut_ptr()) }?;
        Ok(unsafe { capas.assume_init() })
    }
    /// Change this handles mode.
    ///
    /// The initiator is the filehandle that is used to initiate messages, i.e. it commands other CEC devices.
    /// The follower is the filehandle that receives messages sent to the CEC adapter and processes them.
    pub fn set_mode(&self, initiator: CecModeInitiator, follower: CecModeFollower) -> io::Result<()> {
        let mode = u32::from(initiator) | u32::from(follower);
        unsafe { set_mode(self.0.as_raw_fd(), &mode) }?;
        Ok(())
    }
    /// Query physical addresses
    /// e.g. 0x3300 -> 3.3.0.0
    pub fn get_phys(&self) -> io::Result<u16> {
        let mut addr = 0;
        unsafe { get_phys(self.0.as_raw_fd(), &mut addr) }?;
        Ok(addr)
    }
    /**
     * Set logical addresses.
     *
     * To clear existing logical addresses set num_log_addrs to 0.
     * Setting addresses while some are configured fails with EBUSY.
     * Blocks until the addresses are claimed if the physical address is valid.
     */
    pub fn set_log(&self, mut log: CecLogAddrs) -> io::Result<()> {
        unsafe { set_log(self.0.as_raw_fd(), &mut log) }?;
        Ok(())
    }
    /// Query logical addresses
    pub fn get_log(&self) -> io::Result<CecLogAddrs> {
        let mut log = MaybeUninit::uninit();
        unsafe { get_log(self.0.as_raw_fd(), log.as_mut_ptr()) }?;
        Ok(unsafe { log.assume_init() })
    }
    /// Send `msg` and fill in the transmit status and, if requested, the reply.
    pub fn transmit(&self, msg: &mut CecMsg) -> io::Result<()> {
        unsafe { transmit(self.0.as_raw_fd(), msg) }?;
        Ok(())
    }
    /// receive a single message.
    /// block for at most `timeout` ms.
    /// the available messages depend on [CecModeFollower]
    pub fn rec_for(&self, timeout: u32) -> io::Result<CecMsg> {
        let mut msg = MaybeUninit::uninit();
        let ptr: *mut CecMsg = msg.as_mut_ptr();
        unsafe { std::ptr::addr_of_mut!((*ptr).timeout).write(timeout) };
        unsafe { receive(self.0.as_raw_fd(), ptr) }?;
        Ok(unsafe { msg.assume_init() })
    }
}

impl AsRawFd for CecDevice {
    fn as_raw_fd(&self) -> std::os::unix::prelude::RawFd {
        self.0.as_raw_fd()
    }
}

/// `cec12` -> 12
fn node_number(file_name: &str) -> Option<u32> {
    file_name.strip_prefix("cec")?.parse().ok()
}

fn prim_dev_type(t: DeviceType) -> (CecPrimDevType, CecLogAddrType) {
    match t {
        DeviceType::Tv => (CecPrimDevType::TV, CecLogAddrType::TV),
        DeviceType::RecordingDevice => (CecPrimDevType::RECORD, CecLogAddrType::RECORD),
        DeviceType::Tuner => (CecPrimDevType::TUNER, CecLogAddrType::TUNER),
        DeviceType::PlaybackDevice => (CecPrimDevType::PLAYBACK, CecLogAddrType::PLAYBACK),
        DeviceType::AudioSystem => (CecPrimDevType::AUDIOSYSTEM, CecLogAddrType::AUDIOSYSTEM),
    }
}

/// The addresses to claim for `profile`
fn log_addrs_for(profile: &DeviceProfile) -> CecLogAddrs {
    let (prim, typ) = prim_dev_type(profile.device_type);
    let mut log = CecLogAddrs {
        cec_version: CEC_VERSION_1_4,
        num_log_addrs: 1,
        vendor_id: CEC_VENDOR_ID_NONE,
        flags: CecLogAddrFlags::ALLOW_UNREG_FALLBACK,
        osd_name: profile.name().into(),
        ..Default::default()
    };
    log.primary_device_type[0] = prim;
    log.log_addr_type[0] = typ;
    log
}

/// 3 byte big endian vendor ID
fn vendor_from_params(p: &[u8]) -> Option<u32> {
    match p {
        [a, b, c, ..] => Some(u32::from_be_bytes([0, *a, *b, *c])),
        _ => None,
    }
}
/// 2 byte big endian physical address
fn phys_from_params(p: &[u8]) -> Option<u16> {
    match p {
        [a, b, ..] => Some(u16::from_be_bytes([*a, *b])),
        _ => None,
    }
}
/// ISO 639-2 code, 3 ASCII letters
fn language_from_params(p: &[u8]) -> Option<String> {
    let code = p.get(..3)?;
    code.iter()
        .all(u8::is_ascii_alphabetic)
        .then(|| String::from_utf8_lossy(code).into_owned())
}

/// The initiator of `msg` if it is an Active Source received after `sent_at` (ns)
fn fresh_active_source(msg: &CecMsg, sent_at: u64) -> Option<LogicalAddress> {
    (msg.opcode() == Some(CecOpcode::ActiveSource.into()) && msg.rx_ts() > sent_at)
        .then(|| msg.initiator())
}

fn clear_log(dev: &CecDevice) -> io::Result<()> {
    dev.set_log(CecLogAddrs {
        num_log_addrs: 0,
        ..Default::default()
    })
}

/// Poll `get_log` until it reports a claimed address.
///
/// On failure `unclaim` runs before the reason is returned.
fn await_claim(
    mut get_log: impl FnMut() -> io::Result<CecLogAddrs>,
    timeout: Duration,
    unclaim: impl FnOnce(),
) -> std::result::Result<LogicalAddress, String> {
    let deadline = Instant::now() + timeout;
    let reason = loop {
        match get_log() {
            Ok(log) => {
                if let Some(own) = log.primary() {
                    return Ok(own);
                }
            }
            Err(e) => break e.to_string(),
        }
        if Instant::now() >= deadline {
            break "no logical address could be claimed".to_string();
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    unclaim();
    Err(reason)
}

struct Open {
    dev: CecDevice,
    /// the claimed address, initiator of everything this driver sends
    own: LogicalAddress,
    /// whether this handle configured the address and has to clear it again
    claimed: bool,
    reply_timeout: Duration,
    /// the last answer to Request Active Source and when it came
    active_source: Option<(Instant, Option<LogicalAddress>)>,
}

/// Drives `/dev/cecN` through the kernel framework.
pub struct LinuxDriver {
    dev_dir: PathBuf,
    profile: Option<DeviceProfile>,
    sink: Option<Arc<dyn LogSink>>,
    open: Option<Open>,
}

impl Default for LinuxDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxDriver {
    /// Look for adapters in `/dev`
    pub fn new() -> Self {
        Self::with_dev_dir("/dev")
    }
    /// Look for `cecN` nodes in `dir` instead of `/dev`
    pub fn with_dev_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dev_dir: dir.into(),
            profile: None,
            sink: None,
            open: None,
        }
    }

    fn emit(&self, level: Level, msg: impl Into<String>) {
        if let Some(sink) = &self.sink {
            sink.log(LogMessage::new(level, msg));
        }
    }

    fn opened(&self) -> Result<&Open> {
        self.open.as_ref().ok_or(CecError::NotOpen)
    }

    /// Transmit `frame` and return the message with the transmit status filled in
    fn send_msg(&self, frame: &CecFrame) -> Result<CecMsg> {
        let o = self.opened()?;
        let mut msg = CecMsg::from_frame(frame);
        o.dev.transmit(&mut msg)?;
        self.emit(Level::Debug, format!(">> {frame}"));
        if !msg.tx_ok() {
            self.emit(Level::Debug, format!("not acknowledged: {}", msg.tx_report()));
        }
        Ok(msg)
    }

    fn send(&self, frame: &CecFrame) -> Result<bool> {
        Ok(self.send_msg(frame)?.tx_ok())
    }

    fn send_opcode(&self, to: LogicalAddress, opcode: CecOpcode, params: &[u8]) -> Result<bool> {
        let own = self.opened()?.own;
        self.send(&CecFrame::new(own, to, Some(opcode.into()), params)?)
    }

    /// Ask `to` with `opcode` and return the parameters of its `wait_for` answer.
    ///
    /// `None` if the request was not acknowledged, aborted or timed out.
    fn request(&self, to: LogicalAddress, opcode: CecOpcode, wait_for: CecOpcode) -> Result<Option<Vec<u8>>> {
        let o = self.opened()?;
        let frame = CecFrame::new(o.own, to, Some(opcode.into()), &[])?;
        let mut msg = CecMsg::from_frame(&frame);
        msg.reply = wait_for.into();
        msg.timeout = o.reply_timeout.as_millis().clamp(1, u32::MAX as u128) as u32;
        self.emit(Level::Debug, format!(">> {frame}"));
        match o.dev.transmit(&mut msg) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        if !msg.tx_ok() {
            self.emit(Level::Debug, format!("{to} did not answer: {}", msg.tx_report()));
            return Ok(None);
        }
        if !msg.rx_ok() {
            self.emit(Level::Debug, format!("{to} aborted {opcode:?}"));
            return Ok(None);
        }
        if let Some(reply) = msg.frame() {
            self.emit(Level::Debug, format!("<< {reply}"));
        }
        Ok(Some(msg.parameters().to_vec()))
    }

    fn key(&self, to: LogicalAddress, key: u8) -> Result<bool> {
        Ok(self.send_opcode(to, CecOpcode::UserControlPressed, &[key])?
            && self.send_opcode(to, CecOpcode::UserControlReleased, &[])?)
    }

    /// Who answers Request Active Source, cached for one reply timeout
    fn active_source(&mut self) -> Result<Option<LogicalAddress>> {
        let o = self.opened()?;
        if let Some((at, source)) = o.active_source {
            if at.elapsed() < o.reply_timeout {
                return Ok(source);
            }
        }
        let reply_timeout = o.reply_timeout;
        let request = CecFrame::new(
            o.own,
            LogicalAddress::BROADCAST,
            Some(CecOpcode::RequestActiveSource.into()),
            &[],
        )?;
        // older Active Source broadcasts may still sit in the receive queue
        let sent_at = self.send_msg(&request)?.tx_ts();

        let deadline = Instant::now() + reply_timeout;
        let mut source = None;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            let ms = left.as_millis().clamp(1, u32::MAX as u128) as u32;
            let msg = match self.opened()?.dev.rec_for(ms) {
                Ok(msg) => msg,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            };
            if let Some(addr) = fresh_active_source(&msg, sent_at) {
                if let Some(phys) = phys_from_params(msg.parameters()) {
                    self.emit(Level::Debug, format!("active source is {addr} at {phys:04x}"));
                }
                source = Some(addr);
                break;
            }
        }
        if let Some(o) = self.open.as_mut() {
            o.active_source = Some((Instant::now(), source));
        }
        Ok(source)
    }

    /// Clear the logical address if this handle set it
    fn release(&mut self) {
        if let Some(o) = self.open.take() {
            if o.claimed {
                if let Err(e) = clear_log(&o.dev) {
                    self.emit(Level::Warn, format!("could not release {}: {e}", o.own));
                }
            }
        }
    }
}

impl CecDriver for LinuxDriver {
    fn initialize(&mut self, profile: &DeviceProfile, sink: Arc<dyn LogSink>) -> Result<()> {
        if profile.name().is_empty() {
            return Err(CecError::InitFailed("empty device name".into()));
        }
        self.profile = Some(profile.clone());
        self.sink = Some(sink);
        Ok(())
    }

    fn enumerate_adapters(&mut self, max: usize) -> Result<Vec<Adapter>> {
        let mut nodes = Vec::new();
        for entry in std::fs::read_dir(&self.dev_dir)? {
            let entry = entry?;
            if let Some(n) = entry.file_name().to_str().and_then(node_number) {
                nodes.push((n, entry.path()));
            }
        }
        nodes.sort();

        let mut adapters = Vec::new();
        for (_, path) in nodes.into_iter().take(max) {
            let comm = match CecDevice::open(&path).and_then(|d| d.get_capas()) {
                Ok(caps) => caps.driver().to_string(),
                Err(e) => {
                    self.emit(Level::Warn, format!("{}: {e}", path.display()));
                    continue;
                }
            };
            adapters.push(Adapter::new(path.to_string_lossy(), comm));
        }
        Ok(adapters)
    }

    fn open_adapter(&mut self, adapter: &Adapter, timeouts: Timeouts) -> Result<()> {
        let profile = self
            .profile
            .clone()
            .ok_or_else(|| CecError::InitFailed("driver is not initialized".into()))?;
        let failed = |reason: String| CecError::OpenFailed {
            comm: adapter.comm.clone(),
            reason,
        };
        self.release();

        let dev = CecDevice::open(&adapter.path).map_err(|e| failed(e.to_string()))?;
        let caps = dev.get_capas().map_err(|e| failed(e.to_string()))?;
        if !caps.capabilities().contains(Capabilities::TRANSMIT) {
            return Err(failed(format!("{} can not transmit", caps.name())));
        }
        dev.set_mode(CecModeInitiator::Send, CecModeFollower::All)
            .map_err(|e| failed(e.to_string()))?;

        let claimed = caps.capabilities().contains(Capabilities::LOG_ADDRS);
        let unclaim = || {
            if claimed {
                if let Err(e) = clear_log(&dev) {
                    self.emit(Level::Warn, format!("could not release {}: {e}", adapter.path));
                }
            }
        };
        if claimed {
            clear_log(&dev).map_err(|e| failed(e.to_string()))?;
            if let Err(e) = dev.set_log(log_addrs_for(&profile)) {
                unclaim();
                return Err(failed(e.to_string()));
            }
        }
        let own = await_claim(|| dev.get_log(), timeouts.connect, &unclaim).map_err(failed)?;
        self.emit(
            Level::Info,
            format!("{} ({}) claimed {own} as {}", adapter.path, caps.driver(), profile.name()),
        );
        self.open = Some(Open {
            dev,
            own,
            claimed,
            reply_timeout: timeouts.reply,
            active_source: None,
        });
        Ok(())
    }

    fn transmit_frame(&mut self, frame: &CecFrame) -> Result<bool> {
        self.send(frame)
    }

    fn query_active(&mut self, addr: LogicalAddress) -> Result<bool> {
        let own = self.opened()?.own;
        if addr.is_broadcast() {
            return Ok(false);
        }
        if addr == own {
            return Ok(true);
        }
        self.send(&CecFrame::poll(own, addr))
    }
    fn query_osd_name(&mut self, addr: LogicalAddress) -> Result<Option<String>> {
        if addr == self.opened()?.own {
            return Ok(self.profile.as_ref().map(|p| p.name().to_string()));
        }
        Ok(self
            .request(addr, CecOpcode::GiveOsdName, CecOpcode::SetOsdName)?
            .map(|p| OSDStr::<15>::from(&p[..]).to_string()))
    }
    fn query_physical_address(&mut self, addr: LogicalAddress) -> Result<u16> {
        let o = self.opened()?;
        if addr == o.own {
            return Ok(o.dev.get_phys()?);
        }
        Ok(self
            .request(addr, CecOpcode::GivePhysicalAddr, CecOpcode::ReportPhysicalAddr)?
            .and_then(|p| phys_from_params(&p))
            .unwrap_or(CEC_PHYS_ADDR_INVALID))
    }
    fn query_power_status(&mut self, addr: LogicalAddress) -> Result<u8> {
        if addr == self.opened()?.own {
            return Ok(0);
        }
        Ok(self
            .request(addr, CecOpcode::GiveDevicePowerStatus, CecOpcode::ReportPowerStatus)?
            .and_then(|p| p.first().copied())
            .unwrap_or(0x99))
    }
    fn query_vendor_id(&mut self, addr: LogicalAddress) -> Result<u32> {
        if addr == self.opened()?.own {
            return Ok(0);
        }
        Ok(self
            .request(addr, CecOpcode::GiveDeviceVendorId, CecOpcode::DeviceVendorId)?
            .and_then(|p| vendor_from_params(&p))
            .unwrap_or(0))
    }
    fn query_cec_version(&mut self, addr: LogicalAddress) -> Result<u8> {
        if addr == self.opened()?.own {
            return Ok(CEC_VERSION_1_4);
        }
        Ok(self
            .request(addr, CecOpcode::GetCecVersion, CecOpcode::CecVersion)?
            .and_then(|p| p.first().copied())
            .unwrap_or(0))
    }
    fn query_menu_language(&mut self, addr: LogicalAddress) -> Result<Option<String>> {
        if addr == self.opened()?.own {
            return Ok(None);
        }
        Ok(self
            .request(addr, CecOpcode::GetMenuLanguage, CecOpcode::SetMenuLanguage)?
            .and_then(|p| language_from_params(&p)))
    }
    fn query_active_source(&mut self, addr: LogicalAddress) -> Result<bool> {
        Ok(self.active_source()? == Some(addr))
    }

    fn send_key_press(&mut self, addr: LogicalAddress, key: u8) -> Result<bool> {
        self.send_opcode(addr, CecOpcode::UserControlPressed, &[key])
    }
    fn send_key_release(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.send_opcode(addr, CecOpcode::UserControlReleased, &[])
    }
    /// Image View On for the TV (and for broadcast), the power key for everything else
    fn power_on_devices(&mut self, addr: LogicalAddress) -> Result<bool> {
        if addr == LogicalAddress::TV || addr.is_broadcast() {
            self.send_opcode(LogicalAddress::TV, CecOpcode::ImageViewOn, &[])
        } else {
            self.key(addr, KEY_POWER)
        }
    }
    fn standby_devices(&mut self, addr: LogicalAddress) -> Result<bool> {
        self.send_opcode(addr, CecOpcode::Standby, &[])
    }
    fn volume_up(&mut self) -> Result<bool> {
        self.key(LogicalAddress::AUDIO, KEY_VOLUME_UP)
    }
    fn volume_down(&mut self) -> Result<bool> {
        self.key(LogicalAddress::AUDIO, KEY_VOLUME_DOWN)
    }
    fn mute_audio(&mut self) -> Result<bool> {
        self.key(LogicalAddress::AUDIO, KEY_MUTE)
    }

    fn destroy(&mut self) {
        self.release();
        self.emit(Level::Debug, "adapter released");
        self.sink = None;
        self.profile = None;
    }
}

impl Drop for LinuxDriver {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_numbers() {
        assert_eq!(node_number("cec0"), Some(0));
        assert_eq!(node_number("cec12"), Some(12));
        assert_eq!(node_number("cec"), None);
        assert_eq!(node_number("cec-notifier"), None);
        assert_eq!(node_number("ttyUSB0"), None);
    }

    #[test]
    fn plain_files_are_skipped() {
        let dir = std::env::temp_dir().join(format!("cec_control_enum_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["cec10", "cec2", "null"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let sink: Arc<dyn LogSink> = Arc::new(|_: LogMessage| {});
        let mut driver = LinuxDriver::with_dev_dir(&dir);
        driver.initialize(&DeviceProfile::new("t"), sink).unwrap();
        // plain files are no CEC devices, so they are skipped with a warning
        assert!(driver.enumerate_adapters(10).unwrap().is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_dev_dir_is_an_io_error() {
        let mut driver = LinuxDriver::with_dev_dir("/nonexistent/cec_control");
        assert!(matches!(driver.enumerate_adapters(10), Err(CecError::Io(_))));
    }

    #[test]
    fn not_open() {
        let mut driver = LinuxDriver::new();
        assert!(matches!(driver.volume_up(), Err(CecError::NotOpen)));
        assert!(matches!(
            driver.query_active(LogicalAddress::TV),
            Err(CecError::NotOpen)
        ));
        driver.destroy();
    }

    #[test]
    fn own_address_is_answered_locally() {
        let path = std::env::temp_dir().join(format!("cec_control_own_{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let mut driver = LinuxDriver::new();
        driver
            .initialize(&DeviceProfile::new("pi"), Arc::new(|_: LogMessage| {}))
            .unwrap();
        // a plain file fails every ioctl
        driver.open = Some(Open {
            dev: CecDevice::open(&path).unwrap(),
            own: LogicalAddress::RECORDING,
            claimed: false,
            reply_timeout: Duration::from_millis(10),
            active_source: None,
        });
        let own = LogicalAddress::RECORDING;
        assert!(driver.query_active(own).unwrap());
        assert_eq!(driver.query_osd_name(own).unwrap().as_deref(), Some("pi"));
        assert_eq!(driver.query_vendor_id(own).unwrap(), 0);
        assert_eq!(driver.query_menu_language(own).unwrap(), None);
        assert_eq!(driver.query_power_status(own).unwrap(), 0);
        assert_eq!(driver.query_cec_version(own).unwrap(), CEC_VERSION_1_4);
        assert!(matches!(
            driver.query_vendor_id(LogicalAddress::TV),
            Err(CecError::Io(_))
        ));
        driver.destroy();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_without_profile() {
        let mut driver = LinuxDriver::new();
        let adapter = Adapter::new("/dev/cec0", "vc4");
        assert!(matches!(
            driver.open_adapter(&adapter, Timeouts::default()),
            Err(CecError::InitFailed(_))
        ));
    }

    #[test]
    fn parameters() {
        assert_eq!(vendor_from_params(&[0x08, 0x00, 0x46]), Some(0x080046));
        assert_eq!(vendor_from_params(&[0x08]), None);
        assert_eq!(phys_from_params(&[0x21, 0x00]), Some(0x2100));
        assert_eq!(phys_from_params(&[]), None);
        assert_eq!(language_from_params(b"eng"), Some("eng".to_string()));
        assert_eq!(language_from_params(b"e\0g"), None);
        assert_eq!(language_from_params(b"en"), None);
    }

    fn frame_msg(hex: &str) -> CecMsg {
        CecMsg::from_frame(&hex.parse().unwrap())
    }

    #[test]
    fn active_source_must_follow_the_request() {
        let sent_at = 5_000_000_000;
        let stale = frame_msg("0f:82:00:00").received_at(1_000_000_000);
        assert_eq!(fresh_active_source(&stale, sent_at), None);

        let answer = frame_msg("4f:82:21:00").received_at(5_100_000_000);
        assert_eq!(
            fresh_active_source(&answer, sent_at),
            Some(LogicalAddress::PLAYBACK)
        );

        let other = frame_msg("4f:87:00:00:f0").received_at(5_100_000_000);
        assert_eq!(fresh_active_source(&other, sent_at), None);
    }

    fn claimed_as(addr: u8) -> CecLogAddrs {
        let mut log = CecLogAddrs {
            num_log_addrs: 1,
            ..Default::default()
        };
        log.log_addr[0] = addr;
        log
    }

    #[test]
    fn claim_succeeds_without_unclaiming() {
        let unclaimed = std::cell::Cell::new(false);
        let mut answers = vec![Ok(claimed_as(4)), Ok(CecLogAddrs::default())];
        let own = await_claim(
            || answers.pop().unwrap(),
            Duration::from_secs(1),
            || unclaimed.set(true),
        );
        assert_eq!(own, Ok(LogicalAddress::PLAYBACK));
        assert!(!unclaimed.get());
    }

    #[test]
    fn claim_timeout_unclaims() {
        let unclaimed = std::cell::Cell::new(false);
        let own = await_claim(
            || Ok(CecLogAddrs::default()),
            Duration::ZERO,
            || unclaimed.set(true),
        );
        assert_eq!(own, Err("no logical address could be claimed".to_string()));
        assert!(unclaimed.get());
    }

    #[test]
    fn claim_error_unclaims() {
        let unclaimed = std::cell::Cell::new(false);
        let own = await_claim(
            || Err(io::Error::new(io::ErrorKind::Other, "adapter gone")),
            Duration::from_secs(1),
            || unclaimed.set(true),
        );
        assert_eq!(own, Err("adapter gone".to_string()));
        assert!(unclaimed.get());
    }

    #[test]
    fn claims_one_address_of_the_profile_type() {
        let mut profile = DeviceProfile::new("pi4");
        profile.device_type = DeviceType::PlaybackDevice;
        let log = log_addrs_for(&profile);
        assert_eq!(log.num_log_addrs, 1);
        assert_eq!(log.osd_name.as_ref(), "pi4");
        assert_eq!(log.primary_device_type[0], CecPrimDevType::PLAYBACK);
        assert_eq!(log.log_addr_type[0], CecLogAddrType::PLAYBACK);
        assert!(log.flags.contains(CecLogAddrFlags::ALLOW_UNREG_FALLBACK));
    }
}
