//! Serial link to the hub
//!
//! `HubReader` drives the whole connection from `poll`: connect, run the REPL
//! setup one step per settle delay, then keep exactly one position query in
//! flight. Nothing here sleeps, so a stalled hub cannot freeze the frame loop.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::{debug, info, warn};

use super::protocol::{self, HubReading, INIT_SCRIPT, POSITION_QUERY};
use super::{DeviceError, DeviceReader, HubStatus, MotorSample};
use crate::Port;

/// Wait between connection attempts
pub const RETRY_INTERVAL: Duration = Duration::from_secs(2);
/// A query unanswered for this long counts as a timeout
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(250);
/// Upper bound on buffered reply text
const MAX_RX_BUFFER: usize = 4096;

/// Byte stream to the hub
pub trait Transport {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Append whatever is already waiting to `buf` without blocking
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Opens transports; called again after every lost connection
pub trait Connector {
    type Link: Transport;
    fn connect(&mut self) -> Result<Self::Link, DeviceError>;
}

/// A serial port candidate as seen by hub auto-detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    /// USB product/manufacturer text, when the platform reports it
    pub description: Option<String>,
}

/// Choose the port most likely to be the hub.
///
/// Preference: macOS `cu.usbmodem*`, any `usbmodem`, a USB device describing
/// itself as LEGO, then a Linux CDC-ACM device.
pub fn pick_hub_port(candidates: &[PortCandidate]) -> Option<String> {
    let by_name = |needle: &str| {
        candidates
            .iter()
            .find(|c| c.name.to_lowercase().contains(needle))
            .map(|c| c.name.clone())
    };
    by_name("cu.usbmodem")
        .or_else(|| by_name("usbmodem"))
        .or_else(|| {
            candidates
                .iter()
                .find(|c| {
                    c.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains("lego"))
                })
                .map(|c| c.name.clone())
        })
        .or_else(|| by_name("ttyacm"))
}

/// List serial ports in the shape auto-detection expects
pub fn list_candidates() -> Vec<PortCandidate> {
    match serialport::available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|info| {
                let description = match info.port_type {
                    serialport::SerialPortType::UsbPort(usb) => {
                        let text = [usb.manufacturer, usb.product]
                            .into_iter()
                            .flatten()
                            .collect::<Vec<_>>()
                            .join(" ");
                        (!text.is_empty()).then_some(text)
                    }
                    _ => None,
                };
                PortCandidate {
                    name: info.port_name,
                    description,
                }
            })
            .collect(),
        Err(e) => {
            debug!("Serial port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// `serialport`-backed transport
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl Transport for SerialLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let waiting = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Ok(0);
        }
        let start = buf.len();
        buf.resize(start + waiting, 0);
        match self.port.read(&mut buf[start..]) {
            Ok(n) => {
                buf.truncate(start + n);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                buf.truncate(start);
                Ok(0)
            }
            Err(e) => {
                buf.truncate(start);
                Err(e)
            }
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

/// Opens the hub's serial port, auto-detecting it unless a path is given
#[derive(Debug, Clone)]
pub struct SerialConnector {
    pub path: Option<String>,
    pub baud: u32,
    /// Time box for a single read/write call
    pub io_timeout: Duration,
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self {
            path: None,
            baud: protocol::BAUD_RATE,
            io_timeout: Duration::from_millis(10),
        }
    }
}

impl Connector for SerialConnector {
    type Link = SerialLink;

    fn connect(&mut self) -> Result<SerialLink, DeviceError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => pick_hub_port(&list_candidates()).ok_or(DeviceError::NotFound)?,
        };
        let port = serialport::new(&path, self.baud)
            .timeout(self.io_timeout)
            .open()
            .map_err(|e| DeviceError::Io(format!("{path}: {e}")))?;
        info!("Connected to hub on {}", path);
        Ok(SerialLink { port })
    }
}

enum Link<T> {
    Disconnected { retry_at: Duration },
    Initializing { transport: T, step: usize, next_at: Duration },
    Streaming { transport: T, query_sent_at: Option<Duration> },
}

/// Device reader for a hub on a serial REPL
pub struct HubReader<C: Connector> {
    connector: C,
    link: Link<C::Link>,
    rx: String,
    scratch: Vec<u8>,
    fresh: [Option<MotorSample>; 2],
    error: Option<DeviceError>,
    button: bool,
    /// Set once an outage has been logged, cleared on reconnect
    outage_logged: bool,
}

impl<C: Connector> HubReader<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            link: Link::Disconnected {
                retry_at: Duration::ZERO,
            },
            rx: String::new(),
            scratch: Vec::with_capacity(256),
            fresh: [None, None],
            error: None,
            button: false,
            outage_logged: false,
        }
    }

    fn try_connect(&mut self, now: Duration) -> Link<C::Link> {
        match self.connector.connect() {
            Ok(transport) => Link::Initializing {
                transport,
                step: 0,
                next_at: now,
            },
            Err(e) => {
                if !self.outage_logged {
                    warn!("Hub unavailable ({}); keyboard fallback active", e);
                    self.outage_logged = true;
                } else {
                    debug!("Hub connect attempt failed: {}", e);
                }
                Link::Disconnected {
                    retry_at: now + RETRY_INTERVAL,
                }
            }
        }
    }

    fn run_init_step(
        &mut self,
        mut transport: C::Link,
        step: usize,
        now: Duration,
    ) -> io::Result<Link<C::Link>> {
        let Some(init) = INIT_SCRIPT.get(step) else {
            transport.clear_input()?;
            self.rx.clear();
            self.outage_logged = false;
            info!("Hub initialized");
            return Ok(Link::Streaming {
                transport,
                query_sent_at: None,
            });
        };
        if init.clear_before {
            transport.clear_input()?;
        }
        transport.write_bytes(init.bytes)?;
        Ok(Link::Initializing {
            transport,
            step: step + 1,
            next_at: now + init.settle,
        })
    }

    fn stream(
        &mut self,
        mut transport: C::Link,
        mut query_sent_at: Option<Duration>,
        now: Duration,
    ) -> io::Result<Link<C::Link>> {
        self.scratch.clear();
        if transport.read_available(&mut self.scratch)? > 0 {
            self.rx.push_str(&String::from_utf8_lossy(&self.scratch));
        }

        if let Some(reading) = self.take_reading() {
            self.accept(reading, now);
            query_sent_at = None;
        } else if let Some(sent) = query_sent_at
            && now.saturating_sub(sent) > RESPONSE_TIMEOUT
        {
            debug!("Hub query timed out");
            self.error = Some(DeviceError::Timeout(RESPONSE_TIMEOUT.as_millis() as u64));
            query_sent_at = None;
        }

        if query_sent_at.is_none() {
            transport.write_bytes(POSITION_QUERY)?;
            query_sent_at = Some(now);
        }

        Ok(Link::Streaming {
            transport,
            query_sent_at,
        })
    }

    /// Parse complete lines only, so a half-received reply is never used twice
    fn take_reading(&mut self) -> Option<HubReading> {
        let Some(complete) = protocol::consumed_len(&self.rx) else {
            if self.rx.len() > MAX_RX_BUFFER {
                debug!("Dropping {} bytes of unterminated hub output", self.rx.len());
                self.rx.clear();
            }
            return None;
        };
        let reading = protocol::parse_reply(&self.rx[..complete]);
        self.rx.drain(..complete);
        if self.rx.len() > MAX_RX_BUFFER {
            self.rx.clear();
        }
        reading
    }

    fn accept(&mut self, reading: HubReading, now: Duration) {
        self.fresh = [
            Some(MotorSample {
                port: Port::A,
                angle: reading.angle_a,
                timestamp: now,
            }),
            Some(MotorSample {
                port: Port::B,
                angle: reading.angle_b,
                timestamp: now,
            }),
        ];
        self.button = reading.button;
    }

    fn drop_link(&mut self, err: io::Error, now: Duration) -> Link<C::Link> {
        warn!("Hub link lost: {}", err);
        self.outage_logged = true;
        self.button = false;
        self.rx.clear();
        self.error = Some(DeviceError::Unavailable);
        Link::Disconnected {
            retry_at: now + RETRY_INTERVAL,
        }
    }
}

impl<C: Connector> DeviceReader for HubReader<C> {
    fn poll(&mut self, now: Duration) {
        self.fresh = [None, None];
        self.error = None;

        let link = std::mem::replace(&mut self.link, Link::Disconnected { retry_at: now });
        self.link = match link {
            Link::Disconnected { retry_at } => {
                self.error = Some(DeviceError::Unavailable);
                if now >= retry_at {
                    self.try_connect(now)
                } else {
                    Link::Disconnected { retry_at }
                }
            }
            Link::Initializing {
                transport,
                step,
                next_at,
            } => {
                self.error = Some(DeviceError::Unavailable);
                if now >= next_at {
                    match self.run_init_step(transport, step, now) {
                        Ok(link) => link,
                        Err(e) => self.drop_link(e, now),
                    }
                } else {
                    Link::Initializing {
                        transport,
                        step,
                        next_at,
                    }
                }
            }
            Link::Streaming {
                transport,
                query_sent_at,
            } => match self.stream(transport, query_sent_at, now) {
                Ok(link) => link,
                Err(e) => self.drop_link(e, now),
            },
        };
    }

    fn read_angle(&mut self, port: Port) -> Option<Result<MotorSample, DeviceError>> {
        match self.fresh[port.index()].take() {
            Some(sample) => Some(Ok(sample)),
            None => self.error.clone().map(Err),
        }
    }

    fn button_pressed(&self) -> bool {
        self.button
    }

    fn status(&self) -> HubStatus {
        match self.link {
            Link::Disconnected { .. } => HubStatus::Disconnected,
            Link::Initializing { .. } => HubStatus::Initializing,
            Link::Streaming { .. } => HubStatus::Connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Wire {
        written: Vec<Vec<u8>>,
        incoming: VecDeque<u8>,
        fail_reads: bool,
        connects: u32,
        refuse: bool,
    }

    struct FakeLink(Rc<RefCell<Wire>>);

    impl Transport for FakeLink {
        fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.0.borrow_mut().written.push(bytes.to_vec());
            Ok(())
        }

        fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
            let mut wire = self.0.borrow_mut();
            if wire.fail_reads {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            let n = wire.incoming.len();
            buf.extend(wire.incoming.drain(..));
            Ok(n)
        }

        fn clear_input(&mut self) -> io::Result<()> {
            self.0.borrow_mut().incoming.clear();
            Ok(())
        }
    }

    struct FakeConnector(Rc<RefCell<Wire>>);

    impl Connector for FakeConnector {
        type Link = FakeLink;

        fn connect(&mut self) -> Result<FakeLink, DeviceError> {
            let mut wire = self.0.borrow_mut();
            wire.connects += 1;
            if wire.refuse {
                return Err(DeviceError::NotFound);
            }
            Ok(FakeLink(self.0.clone()))
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn reader() -> (HubReader<FakeConnector>, Rc<RefCell<Wire>>) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        (HubReader::new(FakeConnector(wire.clone())), wire)
    }

    /// Poll every 10 ms until streaming; returns the time reached
    fn connect(reader: &mut HubReader<FakeConnector>) -> Duration {
        let mut now = Duration::ZERO;
        while reader.status() != HubStatus::Connected {
            reader.poll(now);
            now += ms(10);
            assert!(now < ms(2000), "hub never finished init");
        }
        now
    }

    #[test]
    fn test_init_script_is_spread_over_settle_delays() {
        let (mut reader, wire) = reader();
        let reached = connect(&mut reader);
        assert!(reached >= ms(600), "init finished too early: {:?}", reached);

        let written = &wire.borrow().written;
        for (step, bytes) in INIT_SCRIPT.iter().zip(written.iter()) {
            assert_eq!(step.bytes, bytes.as_slice());
        }
        assert_eq!(wire.borrow().connects, 1);
    }

    #[test]
    fn test_reply_becomes_one_sample_per_port() {
        let (mut reader, wire) = reader();
        let mut now = connect(&mut reader);
        reader.poll(now);
        assert_eq!(wire.borrow().written.last().unwrap().as_slice(), POSITION_QUERY);

        wire.borrow_mut()
            .incoming
            .extend(b"POS: 90 -45 True\r\n>>> ".iter());
        now += ms(16);
        reader.poll(now);

        let a = reader.read_angle(Port::A).unwrap().unwrap();
        assert_eq!(a.angle, 90);
        assert_eq!(a.timestamp, now);
        assert_eq!(reader.read_angle(Port::B).unwrap().unwrap().angle, -45);
        assert!(reader.button_pressed());

        // Consumed: nothing fresh until the next reply
        assert_eq!(reader.read_angle(Port::A), None);
        now += ms(16);
        reader.poll(now);
        assert_eq!(reader.read_angle(Port::A), None);
    }

    #[test]
    fn test_partial_reply_waits_for_newline() {
        let (mut reader, wire) = reader();
        let mut now = connect(&mut reader);
        reader.poll(now);

        wire.borrow_mut().incoming.extend(b"POS: 1 2 Tr".iter());
        now += ms(16);
        reader.poll(now);
        assert_eq!(reader.read_angle(Port::A), None);

        wire.borrow_mut().incoming.extend(b"ue\r\n".iter());
        now += ms(16);
        reader.poll(now);
        assert_eq!(reader.read_angle(Port::A).unwrap().unwrap().angle, 1);
    }

    #[test]
    fn test_unterminated_output_is_bounded() {
        let (mut reader, wire) = reader();
        let mut now = connect(&mut reader);
        for _ in 0..50 {
            wire.borrow_mut().incoming.extend([b'.'; 1000]);
            reader.poll(now);
            assert!(reader.rx.len() <= MAX_RX_BUFFER, "rx grew to {}", reader.rx.len());
            now += ms(16);
        }

        // Still streaming and a later reply parses
        wire.borrow_mut().incoming.extend(b"\r\nPOS: 7 8 False\r\n".iter());
        reader.poll(now);
        assert_eq!(reader.read_angle(Port::A).unwrap().unwrap().angle, 7);
    }

    #[test]
    fn test_unanswered_query_times_out_and_is_resent() {
        let (mut reader, wire) = reader();
        let now = connect(&mut reader);
        reader.poll(now);
        let sent = wire.borrow().written.len();

        reader.poll(now + RESPONSE_TIMEOUT + ms(1));
        assert!(matches!(
            reader.read_angle(Port::A),
            Some(Err(DeviceError::Timeout(_)))
        ));
        assert_eq!(wire.borrow().written.len(), sent + 1);
        assert_eq!(reader.status(), HubStatus::Connected);
    }

    #[test]
    fn test_io_error_drops_link_and_reconnects() {
        let (mut reader, wire) = reader();
        let now = connect(&mut reader);

        wire.borrow_mut().fail_reads = true;
        reader.poll(now);
        assert_eq!(reader.status(), HubStatus::Disconnected);
        assert_eq!(reader.read_angle(Port::B), Some(Err(DeviceError::Unavailable)));
        assert!(!reader.button_pressed());

        wire.borrow_mut().fail_reads = false;
        reader.poll(now + ms(100));
        assert_eq!(wire.borrow().connects, 1, "retried before the interval");

        reader.poll(now + RETRY_INTERVAL);
        assert_eq!(wire.borrow().connects, 2);
        assert_eq!(reader.status(), HubStatus::Initializing);
    }

    #[test]
    fn test_missing_hub_reports_unavailable_without_hammering() {
        let (mut reader, wire) = reader();
        wire.borrow_mut().refuse = true;
        for i in 0..100 {
            reader.poll(ms(i * 10));
            assert_eq!(reader.read_angle(Port::A), Some(Err(DeviceError::Unavailable)));
        }
        assert_eq!(wire.borrow().connects, 1);
        assert_eq!(reader.status(), HubStatus::Disconnected);
    }

    #[test]
    fn test_pick_hub_port_preferences() {
        let candidates = vec![
            PortCandidate {
                name: "/dev/ttyS0".into(),
                description: None,
            },
            PortCandidate {
                name: "/dev/ttyACM0".into(),
                description: Some("LEGO Technic Large Hub".into()),
            },
            PortCandidate {
                name: "/dev/tty.usbmodem3101".into(),
                description: None,
            },
            PortCandidate {
                name: "/dev/cu.usbmodem3101".into(),
                description: None,
            },
        ];
        assert_eq!(pick_hub_port(&candidates).as_deref(), Some("/dev/cu.usbmodem3101"));
        assert_eq!(pick_hub_port(&candidates[..2]).as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(pick_hub_port(&candidates[..1]), None);
    }
}
