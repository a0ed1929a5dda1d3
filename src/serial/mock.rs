//! In-memory serial devices for exercising discovery and the reading service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::link::ScaleLink;
use super::prober::DeviceOpener;
use crate::utils::error::ScaleError;

#[derive(Debug, Clone)]
pub enum MockStep {
    Line(String),
    Timeout,
    Fail(String),
}

/// Scripted link. Clones share the script, so a re-opened device carries on
/// where the previous handle stopped.
#[derive(Clone)]
pub struct MockLink {
    name: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    repeat: Option<String>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockLink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            repeat: None,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_lines(self, lines: &[&str]) -> Self {
        self.with_steps(lines.iter().map(|l| MockStep::Line(l.to_string())).collect())
    }

    pub fn with_steps(self, steps: Vec<MockStep>) -> Self {
        self.script.lock().unwrap().extend(steps);
        self
    }

    /// Once the script runs out, keep answering with `line`.
    pub fn repeating(mut self, line: &str) -> Self {
        self.repeat = Some(line.to_string());
        self
    }

    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl ScaleLink for MockLink {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, data: &[u8]) -> Result<(), ScaleError> {
        self.written.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ScaleError> {
        match self.script.lock().unwrap().pop_front() {
            Some(MockStep::Line(line)) => Ok(line),
            Some(MockStep::Timeout) => Err(ScaleError::Timeout),
            Some(MockStep::Fail(msg)) => Err(ScaleError::CommunicationError(msg)),
            None => match &self.repeat {
                Some(line) => Ok(line.clone()),
                None => Err(ScaleError::Timeout),
            },
        }
    }
}

/// Opens only the candidates it was given devices for.
#[derive(Clone, Default)]
pub struct MockOpener {
    devices: HashMap<String, MockLink>,
    opens: Arc<AtomicUsize>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, candidate: &str, link: MockLink) -> Self {
        self.devices.insert(candidate.to_string(), link);
        self
    }

    /// Successful opens so far, shared across clones.
    pub fn open_count(&self) -> Arc<AtomicUsize> {
        self.opens.clone()
    }
}

impl DeviceOpener for MockOpener {
    fn open(&self, candidate: &str) -> Result<Box<dyn ScaleLink>, ScaleError> {
        match self.devices.get(candidate) {
            Some(link) => {
                self.opens.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(link.clone()))
            }
            None => Err(ScaleError::ConnectionError(format!(
                "could not open port '{}': No such file or directory",
                candidate
            ))),
        }
    }
}
