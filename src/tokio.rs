//! Hand driver log lines to async code.
//!
//! ```
//! # use cec_control::{mock::MockDriver, Adapter, Session, SessionConfig};
//! let (sink, mut lines) = cec_control::tokio::log_channel();
//! # let driver = MockDriver::new();
//! # driver.add_adapter(Adapter::new("/dev/cec0", "mock"));
//! let _cec = Session::open_with(driver, "cec0", "pi", SessionConfig::default().log_sink(sink)).unwrap();
//! // in async code: lines.recv().await
//! let first = lines.try_recv().unwrap();
//! assert_eq!(first.message, "mock driver initialised as pi");
//! ```
use crate::driver::{LogMessage, LogSink};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Lines are queued without bound. A closed receiver drops them.
impl LogSink for UnboundedSender<LogMessage> {
    fn log(&self, msg: LogMessage) {
        let _ = self.send(msg);
    }
}

/// A sink for [SessionConfig::log_sink](crate::SessionConfig::log_sink) and the receiving end.
pub fn log_channel() -> (UnboundedSender<LogMessage>, UnboundedReceiver<LogMessage>) {
    unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use crate::{Adapter, Session, SessionConfig};

    #[test]
    fn session_lines_arrive() {
        let (sink, mut rx) = log_channel();
        let driver = MockDriver::new();
        driver.add_adapter(Adapter::new("/dev/cec0", "mock"));
        let cec = Session::open_with(driver.clone(), "", "pi", SessionConfig::default().log_sink(sink))
            .unwrap();
        driver.emit_log(LogMessage::new(log::Level::Trace, "too verbose"));
        driver.emit_log(LogMessage::new(log::Level::Error, "bus error"));
        cec.destroy();

        let mut lines = Vec::new();
        while let Ok(m) = rx.try_recv() {
            lines.push(m.message);
        }
        assert_eq!(
            lines,
            vec!["mock driver initialised as pi", "opened mock", "bus error"]
        );
    }
}
