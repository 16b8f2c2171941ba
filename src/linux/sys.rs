//https://www.kernel.org/doc/html/latest/userspace-api/media/cec/cec-api.html

use crate::{CecFrame, LogicalAddress};
use bitflags::bitflags;
use nix::{ioctl_read, ioctl_readwrite, ioctl_write_ptr};
use num_enum::{IntoPrimitive, TryFromPrimitive};

//#define CEC_ADAP_G_CAPS         _IOWR('a',  0, struct cec_caps)
ioctl_readwrite! {
    /// Query device capabilities
    /// Filled by the driver.
    capabilities, b'a',  0, CecCaps
}

/// information about the CEC adapter
#[derive(Debug)]
#[repr(C)]
pub struct CecCaps {
    /// name of the CEC device driver
    driver: OSDStr<32>,
    /// name of the CEC device. @driver + @name must be unique
    name: OSDStr<32>,
    /// number of available logical addresses
    available_log_addrs: u32,
    /// capabilities of the CEC adapter
    capabilities: Capabilities,
    /// version of the CEC adapter framework
    version: u32,
}
impl CecCaps {
    /// kernel driver, e.g. `vc4_hdmi` or `pulse8-cec`
    #[inline]
    pub fn driver(&self) -> &str {
        self.driver.as_ref()
    }
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

bitflags! {
    /// capabilities of the CEC adapter
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Userspace has to configure the physical address.
        const PHYS_ADDR = 0b00000001;
        /// Userspace has to configure the logical addresses.
        const LOG_ADDRS = 0b00000010;
        /// Userspace can transmit messages (and thus become follower as well)
        const TRANSMIT = 0b00000100;
        /// Passthrough all messages instead of processing them.
        const PASSTHROUGH = 0b00001000;
        /// Supports remote control
        const RC = 0b00010000;
        /// Hardware can monitor all messages, not just directed and broadcast.
        const MONITOR_ALL = 0b00100000;
    }
}

// CEC_ADAP_S_LOG_ADDRS
ioctl_readwrite! {
    /// Claim logical addresses. Setting num_log_addrs to 0 clears them.
    /// Blocks until the addresses are claimed if the physical address is valid.
    /// Returns EBUSY if addresses are already configured.
    set_log, b'a',  4, CecLogAddrs
}

// CEC_ADAP_G_LOG_ADDRS
ioctl_read! {
    /// Query logical addresses
    /// Filled by the driver.
    get_log, b'a',  3, CecLogAddrs
}

/// The maximum number of logical addresses one device can be assigned to.
pub const CEC_MAX_LOG_ADDRS: usize = 4;
pub const CEC_LOG_ADDR_INVALID: u8 = 0xff;
pub const CEC_PHYS_ADDR_INVALID: u16 = 0xffff;
/// Use this if there is no vendor ID
pub const CEC_VENDOR_ID_NONE: u32 = 0xffffffff;

/// CEC logical addresses structure
#[derive(Debug)]
#[repr(C)]
pub struct CecLogAddrs {
    /// the claimed logical addresses. Set by the driver.
    pub log_addr: [u8; CEC_MAX_LOG_ADDRS],
    /// current logical address mask. Set by the driver.
    pub log_addr_mask: CecLogAddrMask,
    /// the CEC Version Operand the adapter should implement. Set by the caller.
    pub cec_version: u8,
    /// how many logical addresses should be claimed. Set by the caller.
    /// The driver returns how many it could claim.
    pub num_log_addrs: u8,
    /// the vendor ID of the device. Set by the caller.
    pub vendor_id: u32,
    pub flags: CecLogAddrFlags,
    /// the OSD name of the device. Set by the caller
    pub osd_name: OSDStr<15>,
    /// the primary device type for each logical address. Set by the caller.
    pub primary_device_type: [CecPrimDevType; CEC_MAX_LOG_ADDRS],
    /// the logical address types. Set by the caller.
    pub log_addr_type: [CecLogAddrType; CEC_MAX_LOG_ADDRS],
    /// CEC 2.0: all device types represented by the logical address.
    pub all_device_types: [u8; CEC_MAX_LOG_ADDRS],
    /// CEC 2.0: The logical address features.
    pub features: [[u8; 12]; CEC_MAX_LOG_ADDRS],
}
impl Default for CecLogAddrs {
    fn default() -> Self {
        Self {
            log_addr: [CEC_LOG_ADDR_INVALID; CEC_MAX_LOG_ADDRS],
            log_addr_mask: CecLogAddrMask::empty(),
            cec_version: 5,
            num_log_addrs: 0,
            vendor_id: CEC_VENDOR_ID_NONE,
            flags: CecLogAddrFlags::empty(),
            osd_name: Default::default(),
            primary_device_type: [CecPrimDevType::RECORD; CEC_MAX_LOG_ADDRS],
            log_addr_type: [CecLogAddrType::RECORD; CEC_MAX_LOG_ADDRS],
            all_device_types: Default::default(),
            features: Default::default(),
        }
    }
}
impl CecLogAddrs {
    /// The first claimed address, if any
    pub fn primary(&self) -> Option<LogicalAddress> {
        self.log_addr
            .iter()
            .take(self.num_log_addrs as usize)
            .find(|a| **a != CEC_LOG_ADDR_INVALID)
            .and_then(|a| LogicalAddress::new(*a).ok())
    }
}

bitflags! {
    /// Flags for [CecLogAddrs]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CecLogAddrFlags : u32 {
        /// Fall back to the Unregistered logical address if none of the requested type can be claimed.
        const ALLOW_UNREG_FALLBACK = (1 << 0);
    }
}

bitflags! {
    /// The bitmask of all logical addresses this adapter has claimed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CecLogAddrMask: u16 {
        const _ = !0;
    }
}

/// Primary Device Type Operand (prim_devtype)
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum CecPrimDevType {
    TV = 0,
    RECORD = 1,
    TUNER = 3,
    PLAYBACK = 4,
    AUDIOSYSTEM = 5,
    SWITCH = 6,
    PROCESSOR = 7,
}
/// The logical address types that the CEC device wants to claim
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum CecLogAddrType {
    TV = 0,
    RECORD = 1,
    TUNER = 2,
    PLAYBACK = 3,
    AUDIOSYSTEM = 4,
    SPECIFIC = 5,
    UNREGISTERED = 6,
}

//#define CEC_ADAP_G_PHYS_ADDR    _IOR('a',  1, __u16)
ioctl_read! {
    /// Query physical addresses
    /// Filled by the driver.
    get_phys, b'a',  1, u16
}

//#define CEC_S_MODE              _IOW('a',  9, __u32)
ioctl_write_ptr! {
    /// Select initiator and follower mode of this filehandle.
    set_mode, b'a',  9, u32
}
/// Modes for initiator
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u32)]
pub enum CecModeInitiator {
    /// Transmiting not possible (but others can)
    None = 0,
    /// **Default** Shared access
    Send = 1,
    /// Do not allow other senders
    Exclusive = 2,
}
/// Modes for follower
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u32)]
pub enum CecModeFollower {
    /// **Default**: Only retrieve replies to own (this handles) messages
    RepliesOnly = 0x0 << 4,
    /// Retrieve all messages for this device, including broadcasts.
    All = 0x1 << 4,
    /// Retrieve all messages and lock this device.
    Exclusive = 0x2 << 4,
}

// ---  Transmit/receive a CEC command  ---
//#define CEC_TRANSMIT            _IOWR('a',  5, struct cec_msg)
ioctl_readwrite! {
    /// Send a message. Blocks until it is sent and, if `reply` is set,
    /// until the reply arrived or `timeout` passed.
    transmit, b'a',  5, CecMsg
}
//#define CEC_RECEIVE             _IOWR('a',  6, struct cec_msg)
ioctl_readwrite! {
    /// Receive a message. Fails with ETIMEDOUT if nothing arrived within `timeout` ms.
    receive, b'a',  6, CecMsg
}

const CEC_MAX_MSG_SIZE: usize = 16;

#[derive(Debug)]
#[repr(C)]
pub struct CecMsg {
    /// Timestamp in nanoseconds using CLOCK_MONOTONIC. Set by the driver when the message transmission has finished.
    tx_ts: u64,
    /// Timestamp in nanoseconds using CLOCK_MONOTONIC. Set by the driver when the message was received.
    rx_ts: u64,
    /// Length in bytes of the message.
    pub len: u32,
    /// The timeout (in ms) that is used to timeout CEC_RECEIVE,
    /// or to wait for a reply with CEC_TRANSMIT. 0 means 1 second for replies.
    pub timeout: u32,
    /// The framework assigns a sequence number to messages that are sent.
    pub sequence: u32,
    /// No flags are defined yet, so set this to 0.
    flags: u32,
    /// The message payload. Includes initiator, destination and opcode.
    pub msg: [u8; CEC_MAX_MSG_SIZE],
    /// If non-zero, wait for a reply with this opcode.
    /// Set to [CecOpcode::FeatureAbort] to wait for a possible abort.
    /// Zero on return if sending failed or the reply was a feature abort.
    pub reply: u8,
    /// The message receive status bits. Set by the driver.
    rx_status: RxStatus,
    /// The message transmit status bits. Set by the driver.
    tx_status: TxStatus,
    tx_arb_lost_cnt: u8,
    tx_nack_cnt: u8,
    tx_low_drive_cnt: u8,
    tx_error_cnt: u8,
}
impl CecMsg {
    /// The message for `frame`
    pub fn from_frame(frame: &CecFrame) -> CecMsg {
        let bytes = frame.to_bytes();
        let mut m = Self {
            tx_ts: 0,
            rx_ts: 0,
            len: bytes.len() as u32,
            timeout: 0,
            sequence: 0,
            flags: 0,
            msg: [0; CEC_MAX_MSG_SIZE],
            reply: 0,
            rx_status: RxStatus::empty(),
            tx_status: TxStatus::empty(),
            tx_arb_lost_cnt: 0,
            tx_nack_cnt: 0,
            tx_low_drive_cnt: 0,
            tx_error_cnt: 0,
        };
        m.msg[..bytes.len()].copy_from_slice(&bytes);
        m
    }
    /// The payload as frame. None if the driver filled in garbage.
    pub fn frame(&self) -> Option<CecFrame> {
        let len = (self.len as usize).min(CEC_MAX_MSG_SIZE);
        CecFrame::from_bytes(&self.msg[..len]).ok()
    }
    pub fn initiator(&self) -> LogicalAddress {
        LogicalAddress::from_nibble(self.msg[0] >> 4)
    }
    pub fn opcode(&self) -> Option<u8> {
        (self.len > 1).then_some(self.msg[1])
    }
    pub fn parameters(&self) -> &[u8] {
        let len = (self.len as usize).min(CEC_MAX_MSG_SIZE);
        if len > 2 {
            &self.msg[2..len]
        } else {
            &[]
        }
    }
    /// CLOCK_MONOTONIC ns when the transmission finished
    #[inline]
    pub fn tx_ts(&self) -> u64 {
        self.tx_ts
    }
    /// CLOCK_MONOTONIC ns when the message was received
    #[inline]
    pub fn rx_ts(&self) -> u64 {
        self.rx_ts
    }
    #[cfg(test)]
    pub(super) fn received_at(mut self, rx_ts: u64) -> Self {
        self.rx_ts = rx_ts;
        self
    }
    /// the destination acknowledged the message
    #[inline]
    pub fn tx_ok(&self) -> bool {
        self.tx_status.contains(TxStatus::OK)
    }
    /// a reply was received and it was not a feature abort
    pub fn rx_ok(&self) -> bool {
        self.rx_status.contains(RxStatus::OK) && !self.rx_status.contains(RxStatus::FEATURE_ABORT)
    }
    /// Short summary of the transmit counters
    pub fn tx_report(&self) -> String {
        format!(
            "{:?} arb_lost={} nack={} low_drive={} error={}",
            self.tx_status,
            self.tx_arb_lost_cnt,
            self.tx_nack_cnt,
            self.tx_low_drive_cnt,
            self.tx_error_cnt
        )
    }
}

// ---  cec status field  ---
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TxStatus: u8 {
        const OK          = (1 << 0);
        const ARB_LOST    = (1 << 1);
        const NACK        = (1 << 2);
        const LOW_DRIVE   = (1 << 3);
        const ERROR       = (1 << 4);
        const MAX_RETRIES = (1 << 5);
    }
}
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RxStatus: u8 {
        const OK            = (1 << 0);
        const TIMEOUT       = (1 << 1);
        const FEATURE_ABORT = (1 << 2);
    }
}

/// The opcodes this crate sends or waits for
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecOpcode {
    /// __Parameters:__ 2byte - physical address of active source
    ActiveSource = 0x82,
    /// Sent to the TV to make it leave standby
    ImageViewOn = 0x04,
    /// Broadcast, answered by the active source with [CecOpcode::ActiveSource]
    RequestActiveSource = 0x85,
    /// Switch one or all devices to standby
    Standby = 0x36,
    /// __Parameters:__ CEC Version Operand
    CecVersion = 0x9e,
    GetCecVersion = 0x9f,
    GivePhysicalAddr = 0x83,
    /// __Parameters:__ 2byte physical address, 1byte device type
    ReportPhysicalAddr = 0x84,
    GetMenuLanguage = 0x91,
    /// __Parameters:__ 3byte ISO 639-2 language code
    SetMenuLanguage = 0x32,
    /// __Parameters:__ 3byte vendor ID
    DeviceVendorId = 0x87,
    GiveDeviceVendorId = 0x8c,
    GiveOsdName = 0x46,
    /// __Parameters:__ up to 14 ASCII characters
    SetOsdName = 0x47,
    /// __Parameters:__ UI Command (user control code)
    UserControlPressed = 0x44,
    UserControlReleased = 0x45,
    GiveDevicePowerStatus = 0x8f,
    /// __Parameters:__ Power Status Operand
    ReportPowerStatus = 0x90,
    /// __Parameters:__ rejected opcode, abort reason
    FeatureAbort = 0x00,
}

#[allow(non_camel_case_types)]
type c_char = u8; //its actually i8, but that sucks

/// A fixed size, NUL padded ASCII string as used by the kernel structs.
#[repr(transparent)]
#[derive(Clone)]
pub struct OSDStr<const MAX: usize>([c_char; MAX]);

// from message parameters to OSDStr
impl<const MAX: usize> From<&[u8]> for OSDStr<MAX> {
    fn from(value: &[u8]) -> Self {
        let mut osd = OSDStr::default();
        let len = MAX.min(value.len());
        osd.0[..len].clone_from_slice(&value[..len]);
        osd
    }
}

// from a name to OSDStr. Non ASCII characters are replaced with '?'
impl<const MAX: usize> From<&str> for OSDStr<MAX> {
    fn from(value: &str) -> Self {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect();
        // keep the terminating NUL
        Self::from(&bytes[..bytes.len().min(MAX.saturating_sub(1))])
    }
}

// from OSDStr to &str
impl<const MAX: usize> AsRef<str> for OSDStr<MAX> {
    fn as_ref(&self) -> &str {
        match std::ffi::CStr::from_bytes_until_nul(&self.0) {
            Ok(s) => s.to_str().unwrap_or_default(),
            Err(_) => {
                //no terminating null
                std::str::from_utf8(&self.0).unwrap_or_default()
            }
        }
    }
}
impl<const MAX: usize> std::fmt::Display for OSDStr<MAX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
impl<const MAX: usize> std::fmt::Debug for OSDStr<MAX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl<const MAX: usize> Default for OSDStr<MAX> {
    fn default() -> Self {
        Self([0; MAX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_sizes_match_kernel() {
        assert_eq!(std::mem::size_of::<CecMsg>(), 56);
        assert_eq!(std::mem::size_of::<CecCaps>(), 76);
        assert_eq!(std::mem::size_of::<CecLogAddrs>(), 92);
    }

    #[test]
    fn msg_from_frame() {
        let frame: CecFrame = "48:44:41".parse().unwrap();
        let msg = CecMsg::from_frame(&frame);
        assert_eq!(msg.len, 3);
        assert_eq!(&msg.msg[..3], &[0x48, 0x44, 0x41]);
        assert_eq!(msg.initiator(), LogicalAddress::PLAYBACK);
        assert_eq!(msg.opcode(), Some(0x44));
        assert_eq!(msg.parameters(), &[0x41]);
        assert_eq!(msg.frame(), Some(frame));
        assert!(!msg.tx_ok());
    }

    #[test]
    fn poll_msg_has_no_opcode() {
        let msg = CecMsg::from_frame(&CecFrame::poll(LogicalAddress::RECORDING, LogicalAddress::TV));
        assert_eq!(msg.len, 1);
        assert_eq!(msg.opcode(), None);
        assert!(msg.parameters().is_empty());
    }

    #[test]
    fn osd_str() {
        let s: OSDStr<15> = "pi4".into();
        assert_eq!(s.as_ref(), "pi4");
        let s: OSDStr<4> = "living room".into();
        assert_eq!(s.as_ref(), "liv");
        let s: OSDStr<15> = OSDStr::from(&b"Bravia\0\0"[..]);
        assert_eq!(s.to_string(), "Bravia");
    }

    #[test]
    fn primary_address() {
        let mut log = CecLogAddrs::default();
        assert_eq!(log.primary(), None);
        log.num_log_addrs = 1;
        log.log_addr[0] = 1;
        assert_eq!(log.primary(), Some(LogicalAddress::RECORDING));
    }
}
