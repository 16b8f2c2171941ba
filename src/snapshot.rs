//! What every device on the bus currently reports about itself.

use crate::{registry, LogicalAddress, Result, Session};
use std::collections::BTreeMap;

/// Longest OSD name a device can send (the rest of a 16 byte message is header and opcode).
pub const MAX_OSD_NAME: usize = 14;

/// State of one device, as polled by [list_devices].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub logical_address: LogicalAddress,
    pub osd_name: String,
    /// `""` if the vendor is unknown
    pub vendor: &'static str,
    /// `a.b.c.d`
    pub physical_address: String,
    /// `on`, `standby`, `starting`, `shutting down` or `""`
    pub power_status: &'static str,
    /// `1.2` ... `2.0` or `""`
    pub cec_version: &'static str,
    pub active_source: bool,
    pub language: Option<String>,
}

/// Cut at the first NUL and at [MAX_OSD_NAME] characters
fn bounded_osd_name(raw: &str) -> String {
    raw.split('\0')
        .next()
        .unwrap_or_default()
        .chars()
        .take(MAX_OSD_NAME)
        .collect()
}

/// The metadata of a device is informational: a query that fails leaves its field empty.
fn best_effort<T: Default>(addr: LogicalAddress, what: &str, r: Result<T>) -> T {
    r.unwrap_or_else(|e| {
        log::warn!("{what} of {addr}: {e}");
        T::default()
    })
}

/// Poll one active address.
///
/// The queries are independent, so a device changing state meanwhile
/// can show up half old, half new.
pub fn device_state(session: &Session, addr: LogicalAddress) -> DeviceState {
    let osd_name = best_effort(addr, "OSD name", session.osd_name(addr));
    let vendor_id = best_effort(addr, "vendor", session.vendor_id(addr));
    DeviceState {
        logical_address: addr,
        physical_address: best_effort(addr, "physical address", session.physical_address(addr)),
        osd_name: osd_name.as_deref().map(bounded_osd_name).unwrap_or_default(),
        power_status: best_effort(addr, "power status", session.power_status(addr)),
        active_source: best_effort(addr, "active source", session.is_active_source(addr)),
        cec_version: best_effort(addr, "CEC version", session.cec_version(addr)),
        language: best_effort(addr, "menu language", session.menu_language(addr)),
        vendor: registry::vendor_name(vendor_id),
    }
}

/**
 * Poll all 16 logical addresses and describe the active ones, keyed by role name.
 *
 * Addresses that are not active never show up.
 * Fails with [NotOpen](crate::CecError::NotOpen) if the session is not open.
 */
pub fn list_devices(session: &Session) -> Result<BTreeMap<&'static str, DeviceState>> {
    let mut devices = BTreeMap::new();
    for addr in LogicalAddress::all() {
        if !session.is_active(addr)? {
            continue;
        }
        log::debug!("{addr} is active");
        // a later address with the same role name replaces the earlier one
        devices.insert(addr.name(), device_state(session, addr));
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockDevice, MockDriver, Op};
    use crate::{Adapter, SessionConfig};

    fn session(driver: &MockDriver) -> Session {
        driver.add_adapter(Adapter::new("/dev/cec0", "mock"));
        Session::open_with(driver.clone(), "cec0", "snap", SessionConfig::default()).unwrap()
    }

    #[test]
    fn only_active_devices() {
        let driver = MockDriver::new();
        let mut tv = MockDevice::new("Bravia", 0x0000);
        tv.vendor_id = 0x080046;
        tv.menu_language = Some("eng".into());
        driver.add_device(LogicalAddress::TV, tv);
        let mut player = MockDevice::new("Shield", 0x2100);
        player.active_source = true;
        player.power_status = 2;
        driver.add_device(LogicalAddress::PLAYBACK, player);

        let devices = list_devices(&session(&driver)).unwrap();
        assert_eq!(devices.keys().copied().collect::<Vec<_>>(), vec!["Playback", "TV"]);

        let tv = &devices["TV"];
        assert_eq!(tv.logical_address, LogicalAddress::TV);
        assert_eq!(tv.osd_name, "Bravia");
        assert_eq!(tv.vendor, "Sony");
        assert_eq!(tv.physical_address, "0.0.0.0");
        assert_eq!(tv.power_status, "on");
        assert_eq!(tv.cec_version, "1.4");
        assert!(!tv.active_source);
        assert_eq!(tv.language.as_deref(), Some("eng"));

        let player = &devices["Playback"];
        assert_eq!(player.physical_address, "2.1.0.0");
        assert_eq!(player.power_status, "starting");
        assert_eq!(player.vendor, "");
        assert!(player.active_source);
        assert_eq!(player.language, None);
    }

    #[test]
    fn inactive_addresses_are_not_queried() {
        let driver = MockDriver::new();
        driver.add_device(LogicalAddress::AUDIO, MockDevice::new("AVR", 0x1000));
        let s = session(&driver);
        driver.clear_calls();
        list_devices(&s).unwrap();
        let queried: Vec<_> = driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Query(what, addr) if what != "active" => Some(addr),
                _ => None,
            })
            .collect();
        assert_eq!(queried.len(), 7);
        assert!(queried.iter().all(|a| *a == LogicalAddress::AUDIO));
    }

    #[test]
    fn empty_bus() {
        let driver = MockDriver::new();
        assert!(list_devices(&session(&driver)).unwrap().is_empty());
    }

    #[test]
    fn osd_name_is_bounded() {
        let driver = MockDriver::new();
        let mut dev = MockDevice::new("", 0x3000);
        dev.osd_name = Some("Projector\0garbage".into());
        driver.add_device(LogicalAddress::new(3).unwrap(), dev);
        dev = MockDevice::new("An exceedingly long name", 0x4000);
        driver.add_device(LogicalAddress::new(6).unwrap(), dev);

        let devices = list_devices(&session(&driver)).unwrap();
        assert_eq!(devices["Tuner"].osd_name, "Projector");
        assert_eq!(devices["Tuner2"].osd_name, "An exceedingly");
    }

    #[test]
    fn failing_queries_leave_fields_empty() {
        let driver = MockDriver::new();
        driver.add_device(LogicalAddress::TV, MockDevice::new("TV", 0));
        let s = session(&driver);
        assert!(s.is_active(LogicalAddress::TV).unwrap());

        // is_active is a query too, so check device_state directly
        driver.reject(Op::Query);
        let state = device_state(&s, LogicalAddress::TV);
        assert_eq!(
            state,
            DeviceState {
                logical_address: LogicalAddress::TV,
                ..Default::default()
            }
        );
    }
}
