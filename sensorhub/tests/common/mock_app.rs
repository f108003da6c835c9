#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use config::FileFormat;
use tokio::sync::mpsc::UnboundedSender;

use sensorhub::configs::settings::Settings;
use sensorhub::devices::{Climate, Devices, Edge, EdgeSource, EnvironmentSensor, Scanner, SerialLink, SerialTransport};
use sensorhub::errors::{DeviceError, PublishError};
use sensorhub::services::{Message, Publisher};

/// Keeps every message instead of sending it to a broker.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<Message>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn payloads(&self, topic: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|message| message.topic == topic)
            .map(|message| String::from_utf8(message.payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, message: Message) -> Result<(), PublishError> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Returns the same sample on every measurement after failing the first
/// `failures` ones.
#[derive(Clone)]
pub struct FakeEnvironment {
    pub climate: Climate,
    pub failures: usize,
}

impl FakeEnvironment {
    pub fn new(temperature: f32, pressure: f32, humidity: f32) -> Self {
        Self {
            climate: Climate {
                temperature,
                pressure,
                humidity,
            },
            failures: 0,
        }
    }

    pub fn failing(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }
}

#[async_trait]
impl EnvironmentSensor for FakeEnvironment {
    async fn measure(&mut self) -> Result<Climate, DeviceError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(DeviceError::read("fake", "no response"));
        }
        Ok(self.climate)
    }
}

/// Reports the same sightings on every scan.
pub struct FakeScanner {
    pub sightings: Vec<String>,
    pub scans: Mutex<Vec<Duration>>,
}

impl FakeScanner {
    pub fn new(sightings: &[&str]) -> Self {
        Self {
            sightings: sightings.iter().map(|s| s.to_string()).collect(),
            scans: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Scanner for FakeScanner {
    async fn scan(&self, window: Duration, sightings: UnboundedSender<String>) -> Result<(), DeviceError> {
        self.scans.lock().unwrap().push(window);
        for address in &self.sightings {
            let _ = sightings.send(address.clone());
        }
        Ok(())
    }
}

/// Reports its sightings, then never finishes the scan.
pub struct StallingScanner {
    pub sightings: Vec<String>,
}

impl StallingScanner {
    pub fn new(sightings: &[&str]) -> Self {
        Self {
            sightings: sightings.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Scanner for StallingScanner {
    async fn scan(&self, _window: Duration, sightings: UnboundedSender<String>) -> Result<(), DeviceError> {
        for address in &self.sightings {
            let _ = sightings.send(address.clone());
        }
        std::future::pending().await
    }
}

/// Edge source driven by the test through a [`FakeEdgeTrigger`].
#[derive(Default)]
pub struct FakeEdgeSource {
    edges: Arc<Mutex<Option<UnboundedSender<Edge>>>>,
}

#[derive(Clone)]
pub struct FakeEdgeTrigger {
    edges: Arc<Mutex<Option<UnboundedSender<Edge>>>>,
}

impl FakeEdgeSource {
    pub fn new() -> (Self, FakeEdgeTrigger) {
        let source = Self::default();
        let trigger = FakeEdgeTrigger {
            edges: Arc::clone(&source.edges),
        };
        (source, trigger)
    }
}

impl EdgeSource for FakeEdgeSource {
    fn subscribe(&mut self, edges: UnboundedSender<Edge>) -> Result<(), DeviceError> {
        *self.edges.lock().unwrap() = Some(edges);
        Ok(())
    }
}

impl FakeEdgeTrigger {
    pub fn fire(&self, edge: Edge) {
        let edges = self.edges.lock().unwrap();
        edges.as_ref().expect("not subscribed").send(edge).unwrap();
    }
}

/// Serial line answering each open with the next queued reply.
#[derive(Default)]
pub struct FakeSerialTransport {
    replies: Mutex<VecDeque<Vec<u8>>>,
    pub written: Arc<Mutex<Vec<u8>>>,
}

impl FakeSerialTransport {
    pub fn new(replies: &[&[u8]]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|reply| reply.to_vec()).collect()),
            written: Arc::default(),
        }
    }
}

struct FakeLink {
    reply: Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl Read for FakeLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reply.read(buf)
    }
}

impl Write for FakeLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialTransport for FakeSerialTransport {
    fn open(&self) -> io::Result<Box<dyn SerialLink>> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such port"))?;

        Ok(Box::new(FakeLink {
            reply: Cursor::new(reply),
            written: Arc::clone(&self.written),
        }))
    }
}

pub struct MockApp {
    pub settings: Settings,
    pub publisher: Arc<RecordingPublisher>,
}

impl MockApp {
    pub fn new(toml: &str) -> Self {
        Self {
            settings: Settings::parse(toml, FileFormat::Toml).unwrap(),
            publisher: Arc::new(RecordingPublisher::default()),
        }
    }

    pub fn publisher(&self) -> Arc<dyn Publisher> {
        self.publisher.clone()
    }

    pub fn devices() -> Devices {
        Devices::default()
    }
}
