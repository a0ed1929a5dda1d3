use log::{debug, info, warn};
use std::sync::{Mutex, MutexGuard, RwLock};

use super::parser::FrameParser;
use super::reading::{ReadingOutcome, WeightReading};
use crate::config::Config;
use crate::serial::{DeviceProber, ScaleLink};

/// Owns the scale handle and turns one request into one [`ReadingOutcome`].
///
/// Created once at startup and shared behind an `Arc`. The handle mutex is
/// held for the discovery and read of a single call, never across calls.
pub struct ReadingService {
    prober: DeviceProber,
    parser: FrameParser,
    link: Mutex<Option<Box<dyn ScaleLink>>>,
    last_reading: RwLock<Option<WeightReading>>,
}

impl ReadingService {
    pub fn new(prober: DeviceProber, parser: FrameParser) -> Self {
        Self {
            prober,
            parser,
            link: Mutex::new(None),
            last_reading: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let parser = FrameParser::new(config.parser.unit_mode);
        let prober = DeviceProber::from_config(&config.serial, parser);
        info!(
            "⚖️  Reading service ready ({} baud, {} ms timeout, unit mode {:?}, strict probe {})",
            config.serial.baud_rate,
            config.serial.timeout_ms,
            config.parser.unit_mode,
            config.serial.strict_probe
        );
        Self::new(prober, parser)
    }

    pub fn prober(&self) -> &DeviceProber {
        &self.prober
    }

    pub fn get_weight(&self) -> ReadingOutcome {
        let mut slot = self.lock_link();

        if slot.is_none() {
            match self.prober.find_device() {
                Ok(link) => *slot = Some(link),
                Err(_) => return ReadingOutcome::DeviceNotFound,
            }
        }

        let line = match slot.as_mut().map(|link| link.read_line()) {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                if let Some(link) = slot.take() {
                    warn!("⚠️  Read from {} failed, dropping handle: {}", link.port_name(), e);
                }
                return ReadingOutcome::IoError(e.to_string());
            }
            None => return ReadingOutcome::DeviceNotFound,
        };
        drop(slot);

        match self.parser.parse(&line) {
            Ok(parsed) => {
                let reading = WeightReading::new(parsed.value, parsed.unit);
                self.store_last(reading.clone());
                ReadingOutcome::Success(reading)
            }
            Err(e) => {
                debug!("Unparseable scale data: {}", e);
                ReadingOutcome::ParseFailure
            }
        }
    }

    pub fn last_reading(&self) -> Option<WeightReading> {
        match self.last_reading.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        self.lock_link().is_some()
    }

    #[cfg(test)]
    pub(crate) fn connected_port(&self) -> Option<String> {
        self.lock_link().as_ref().map(|link| link.port_name().to_string())
    }

    /// Closes the handle if one is open.
    pub fn shutdown(&self) {
        if let Some(link) = self.lock_link().take() {
            info!("🔌 Closing serial port {}", link.port_name());
        }
    }

    fn store_last(&self, reading: WeightReading) {
        let mut guard = match self.last_reading.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(reading);
    }

    fn lock_link(&self) -> MutexGuard<'_, Option<Box<dyn ScaleLink>>> {
        match self.link.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("⚠️  Scale handle lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Drop for ReadingService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitMode;
    use crate::scale::reading::WeightUnit;
    use crate::serial::mock::{MockLink, MockOpener, MockStep};
    use crate::serial::StaticPortEnumerator;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn service(ports: &[&str], opener: MockOpener) -> ReadingService {
        let parser = FrameParser::new(UnitMode::Legacy);
        let prober = DeviceProber::new(
            Box::new(StaticPortEnumerator::new(ports.iter().map(|p| p.to_string()).collect())),
            Box::new(opener),
            "CHECK",
            false,
            parser,
        );
        ReadingService::new(prober, parser)
    }

    #[test]
    fn test_no_device_is_not_found() {
        let service = service(&["/dev/ttyUSB0"], MockOpener::new());
        assert_eq!(service.get_weight(), ReadingOutcome::DeviceNotFound);
        assert!(!service.is_connected());
        assert!(service.last_reading().is_none());
    }

    #[test]
    fn test_successful_read_updates_last_reading() {
        // first line is consumed by the probe echo
        let device = MockLink::new("/dev/ttyUSB0").with_lines(&["CHECK", "\x02 12.5 g"]);
        let service = service(&["/dev/ttyUSB0"], MockOpener::new().with_device("/dev/ttyUSB0", device));

        let outcome = service.get_weight();
        let reading = outcome.reading().expect("reading");
        assert_eq!(reading.value, 12.5);
        assert_eq!(reading.unit, WeightUnit::G);
        assert_eq!(service.last_reading().as_ref(), Some(reading));
        assert_eq!(service.connected_port().as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn test_parse_failure_keeps_handle() {
        let device = MockLink::new("COM3").with_lines(&["", "ERROR", "7g"]);
        let opener = MockOpener::new().with_device("COM3", device);
        let opens = opener.open_count();
        let service = service(&["COM3"], opener);

        assert_eq!(service.get_weight(), ReadingOutcome::ParseFailure);
        assert!(service.is_connected());

        let outcome = service.get_weight();
        assert_eq!(outcome.reading().map(|r| r.value), Some(7.0));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timeout_discards_handle_and_rediscovers() {
        let device = MockLink::new("COM3")
            .with_steps(vec![
                MockStep::Line("CHECK".into()),
                MockStep::Timeout,
                MockStep::Line("CHECK".into()),
                MockStep::Line("3.0g".into()),
            ]);
        let opener = MockOpener::new().with_device("COM3", device);
        let opens = opener.open_count();
        let service = service(&["COM3"], opener);

        let outcome = service.get_weight();
        assert!(matches!(outcome, ReadingOutcome::IoError(ref msg) if msg.contains("timed out")));
        assert!(!service.is_connected());
        assert_eq!(opens.load(Ordering::SeqCst), 1);

        let outcome = service.get_weight();
        assert_eq!(outcome.reading().map(|r| r.value), Some(3.0));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_io_failure_reports_detail() {
        let device = MockLink::new("COM9")
            .with_steps(vec![MockStep::Line("".into()), MockStep::Fail("device unplugged".into())]);
        let service = service(&["COM9"], MockOpener::new().with_device("COM9", device));

        match service.get_weight() {
            ReadingOutcome::IoError(detail) => assert!(detail.contains("device unplugged")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!service.is_connected());
    }

    #[test]
    fn test_static_device_is_idempotent() {
        let device = MockLink::new("COM1").repeating("ST,GS,+  0.500g");
        let service = service(&["COM1"], MockOpener::new().with_device("COM1", device));

        let first = service.get_weight().reading().cloned().unwrap();
        for _ in 0..5 {
            let next = service.get_weight().reading().cloned().unwrap();
            assert_eq!((next.value, next.unit), (first.value, first.unit));
        }
    }

    #[test]
    fn test_parse_failure_does_not_clear_last_reading() {
        let device = MockLink::new("COM1").with_lines(&["", "4g", "garbage"]);
        let service = service(&["COM1"], MockOpener::new().with_device("COM1", device));

        assert!(service.get_weight().is_success());
        assert_eq!(service.get_weight(), ReadingOutcome::ParseFailure);
        assert_eq!(service.last_reading().map(|r| r.value), Some(4.0));
    }

    #[test]
    fn test_concurrent_callers_are_serialized() {
        let device = MockLink::new("COM1").repeating("10g");
        let opener = MockOpener::new().with_device("COM1", device);
        let opens = opener.open_count();
        let service = Arc::new(service(&["COM1"], opener));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || service.get_weight())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_success());
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_closes_handle() {
        let device = MockLink::new("COM1").repeating("1g");
        let service = service(&["COM1"], MockOpener::new().with_device("COM1", device));
        service.get_weight();
        assert!(service.is_connected());
        service.shutdown();
        assert!(!service.is_connected());
    }
}
