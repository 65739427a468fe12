//! Transport traits and the scripted mock implementation.
//!
//! The pad protocol is a request/response exchange of fixed-size reports
//! addressed by report ID. How a given ID travels (interrupt IN pipe for the
//! sensor stream, feature pipe for configuration) is the backend's concern;
//! callers only see bytes in, bytes out, and the would-block distinction.

use crate::{HidCommonError, HidCommonResult, HidDeviceInfo};

/// Outcome of a non-blocking report read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Payload bytes were written into the caller's buffer.
    Data(usize),
    /// Nothing queued right now. Not an error.
    WouldBlock,
}

/// One open pad's byte-report channel.
pub trait PadTransport {
    /// Read one report's payload into `buf` (the report ID byte is consumed
    /// by the transport framing and not copied).
    fn read_report(&mut self, report_id: u8, buf: &mut [u8]) -> HidCommonResult<ReadOutcome>;

    /// Write one report: ID framing plus `payload`.
    fn write_report(&mut self, report_id: u8, payload: &[u8]) -> HidCommonResult<usize>;

    fn info(&self) -> &HidDeviceInfo;
}

/// Enumeration and session establishment.
pub trait HidBackend {
    fn enumerate(&mut self) -> HidCommonResult<Vec<HidDeviceInfo>>;

    fn open(&mut self, info: &HidDeviceInfo) -> HidCommonResult<Box<dyn PadTransport>>;
}

pub mod mock {
    //! Scripted in-memory transport for tests.
    //!
    //! Reads are served per report ID from an explicit queue, falling back to
    //! a sticky default response. By default every non-empty write becomes the
    //! default response for its report ID, which models a device echoing its
    //! authoritative tables back on the following get.

    use super::*;
    use hid_pad_protocol::report_ids;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard};

    #[derive(Debug)]
    enum ScriptedRead {
        Data(Vec<u8>),
        WouldBlock,
        Fail,
    }

    #[derive(Debug)]
    struct DeviceState {
        queued: HashMap<u8, VecDeque<ScriptedRead>>,
        defaults: HashMap<u8, Vec<u8>>,
        writes: Vec<(u8, Vec<u8>)>,
        reads: Vec<u8>,
        echo_writes: bool,
        disconnected: bool,
        open_fails: bool,
    }

    impl Default for DeviceState {
        fn default() -> Self {
            Self {
                queued: HashMap::new(),
                defaults: HashMap::new(),
                writes: Vec::new(),
                reads: Vec::new(),
                echo_writes: true,
                disconnected: false,
                open_fails: false,
            }
        }
    }

    fn lock(state: &Arc<Mutex<DeviceState>>) -> MutexGuard<'_, DeviceState> {
        state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Transport half handed to the code under test.
    pub struct MockPadTransport {
        info: HidDeviceInfo,
        state: Arc<Mutex<DeviceState>>,
    }

    impl MockPadTransport {
        pub fn new(info: HidDeviceInfo) -> Self {
            Self {
                info,
                state: Arc::new(Mutex::new(DeviceState::default())),
            }
        }

        /// Controller half kept by the test.
        pub fn handle(&self) -> MockDeviceHandle {
            MockDeviceHandle {
                state: Arc::clone(&self.state),
            }
        }
    }

    impl PadTransport for MockPadTransport {
        fn read_report(&mut self, report_id: u8, buf: &mut [u8]) -> HidCommonResult<ReadOutcome> {
            let mut state = lock(&self.state);
            if state.disconnected {
                return Err(HidCommonError::Disconnected);
            }
            state.reads.push(report_id);

            let scripted = state
                .queued
                .get_mut(&report_id)
                .and_then(VecDeque::pop_front);
            let data = match scripted {
                Some(ScriptedRead::Data(data)) => data,
                Some(ScriptedRead::WouldBlock) => return Ok(ReadOutcome::WouldBlock),
                Some(ScriptedRead::Fail) => {
                    return Err(HidCommonError::ReadError("scripted failure".to_string()));
                }
                None => match state.defaults.get(&report_id) {
                    Some(data) => data.clone(),
                    // An idle input stream would-blocks; an unanswered
                    // feature request is a hard failure.
                    None if report_id == report_ids::SENSOR_VALUES => {
                        return Ok(ReadOutcome::WouldBlock);
                    }
                    None => {
                        return Err(HidCommonError::ReadError(format!(
                            "no scripted response for report 0x{report_id:02X}"
                        )));
                    }
                },
            };

            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            Ok(ReadOutcome::Data(len))
        }

        fn write_report(&mut self, report_id: u8, payload: &[u8]) -> HidCommonResult<usize> {
            let mut state = lock(&self.state);
            if state.disconnected {
                return Err(HidCommonError::Disconnected);
            }
            state.writes.push((report_id, payload.to_vec()));
            if state.echo_writes && !payload.is_empty() {
                state.defaults.insert(report_id, payload.to_vec());
            }
            Ok(payload.len())
        }

        fn info(&self) -> &HidDeviceInfo {
            &self.info
        }
    }

    /// Test-side controller for one mock device.
    #[derive(Clone)]
    pub struct MockDeviceHandle {
        state: Arc<Mutex<DeviceState>>,
    }

    impl MockDeviceHandle {
        pub fn queue_read(&self, report_id: u8, payload: Vec<u8>) {
            lock(&self.state)
                .queued
                .entry(report_id)
                .or_default()
                .push_back(ScriptedRead::Data(payload));
        }

        pub fn queue_would_block(&self, report_id: u8) {
            lock(&self.state)
                .queued
                .entry(report_id)
                .or_default()
                .push_back(ScriptedRead::WouldBlock);
        }

        pub fn queue_failure(&self, report_id: u8) {
            lock(&self.state)
                .queued
                .entry(report_id)
                .or_default()
                .push_back(ScriptedRead::Fail);
        }

        /// Sticky response served whenever the queue for `report_id` is empty.
        pub fn set_default_response(&self, report_id: u8, payload: Vec<u8>) {
            lock(&self.state).defaults.insert(report_id, payload);
        }

        pub fn clear_default_response(&self, report_id: u8) {
            lock(&self.state).defaults.remove(&report_id);
        }

        /// Toggle write-echo (on by default).
        pub fn set_echo_writes(&self, echo: bool) {
            lock(&self.state).echo_writes = echo;
        }

        pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
            lock(&self.state).writes.clone()
        }

        pub fn clear_writes(&self) {
            lock(&self.state).writes.clear();
        }

        /// Report IDs of every read issued so far, in order.
        pub fn reads(&self) -> Vec<u8> {
            lock(&self.state).reads.clone()
        }

        pub fn clear_reads(&self) {
            lock(&self.state).reads.clear();
        }

        pub fn read_calls_remaining(&self, report_id: u8) -> usize {
            lock(&self.state)
                .queued
                .get(&report_id)
                .map_or(0, VecDeque::len)
        }

        /// Make every subsequent read and write fail hard.
        pub fn disconnect(&self) {
            lock(&self.state).disconnected = true;
        }

        pub fn reconnect(&self) {
            lock(&self.state).disconnected = false;
        }

        pub fn set_open_fails(&self, fails: bool) {
            lock(&self.state).open_fails = fails;
        }
    }

    #[derive(Default)]
    struct BackendState {
        devices: Vec<(HidDeviceInfo, Arc<Mutex<DeviceState>>)>,
    }

    /// Backend whose enumeration result is editable mid-test, for
    /// plug/unplug/replug sequences.
    pub struct MockBackend {
        state: Arc<Mutex<BackendState>>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(BackendState::default())),
            }
        }

        pub fn handle(&self) -> MockBackendHandle {
            MockBackendHandle {
                state: Arc::clone(&self.state),
            }
        }
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HidBackend for MockBackend {
        fn enumerate(&mut self) -> HidCommonResult<Vec<HidDeviceInfo>> {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            Ok(state.devices.iter().map(|(info, _)| info.clone()).collect())
        }

        fn open(&mut self, info: &HidDeviceInfo) -> HidCommonResult<Box<dyn PadTransport>> {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            for (candidate, device_state) in &state.devices {
                if candidate.path == info.path {
                    if lock(device_state).open_fails {
                        return Err(HidCommonError::OpenError(info.path.clone()));
                    }
                    return Ok(Box::new(MockPadTransport {
                        info: candidate.clone(),
                        state: Arc::clone(device_state),
                    }));
                }
            }
            Err(HidCommonError::DeviceNotFound(info.path.clone()))
        }
    }

    /// Test-side controller for the backend's device list.
    #[derive(Clone)]
    pub struct MockBackendHandle {
        state: Arc<Mutex<BackendState>>,
    }

    impl MockBackendHandle {
        /// Plug in a device; the returned handle scripts its transport.
        pub fn add_device(&self, info: HidDeviceInfo) -> MockDeviceHandle {
            let device_state = Arc::new(Mutex::new(DeviceState::default()));
            let handle = MockDeviceHandle {
                state: Arc::clone(&device_state),
            };
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.devices.push((info, device_state));
            handle
        }

        /// Unplug: removed from enumeration; existing sessions keep their
        /// (now orphaned) state.
        pub fn remove_device(&self, path: &str) {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.devices.retain(|(info, _)| info.path != path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockBackend, MockPadTransport};
    use super::*;
    use hid_pad_protocol::report_ids;

    #[test]
    fn test_mock_serves_queued_then_default() {
        let mut transport = MockPadTransport::new(HidDeviceInfo::new(0x1209, 0xb196, "mock:0"));
        let handle = transport.handle();
        handle.queue_read(report_ids::NAME, vec![1, 2, 3]);
        handle.set_default_response(report_ids::NAME, vec![9, 9]);

        let mut buf = [0u8; 8];
        assert_eq!(
            transport
                .read_report(report_ids::NAME, &mut buf)
                .expect("queued read"),
            ReadOutcome::Data(3)
        );
        assert_eq!(&buf[..3], &[1, 2, 3]);

        assert_eq!(
            transport
                .read_report(report_ids::NAME, &mut buf)
                .expect("default read"),
            ReadOutcome::Data(2)
        );
        assert_eq!(&buf[..2], &[9, 9]);
    }

    #[test]
    fn test_mock_sensor_stream_would_blocks_when_idle() {
        let mut transport = MockPadTransport::new(HidDeviceInfo::new(0x1209, 0xb196, "mock:0"));
        let mut buf = [0u8; 26];
        assert_eq!(
            transport
                .read_report(report_ids::SENSOR_VALUES, &mut buf)
                .expect("idle stream"),
            ReadOutcome::WouldBlock
        );
        // An unanswered feature request is a hard failure, not a would-block.
        assert!(transport.read_report(report_ids::IDENTIFICATION, &mut buf).is_err());
    }

    #[test]
    fn test_mock_echoes_writes() {
        let mut transport = MockPadTransport::new(HidDeviceInfo::new(0x1209, 0xb196, "mock:0"));
        let handle = transport.handle();

        transport
            .write_report(report_ids::LED_MAPPING, &[3, 1, 1, 5, 8, 16])
            .expect("write");
        let mut buf = [0u8; 6];
        assert_eq!(
            transport
                .read_report(report_ids::LED_MAPPING, &mut buf)
                .expect("echo read"),
            ReadOutcome::Data(6)
        );
        assert_eq!(buf, [3, 1, 1, 5, 8, 16]);
        assert_eq!(handle.writes().len(), 1);
    }

    #[test]
    fn test_mock_disconnect_fails_hard() {
        let mut transport = MockPadTransport::new(HidDeviceInfo::new(0x1209, 0xb196, "mock:0"));
        transport.handle().disconnect();

        let mut buf = [0u8; 26];
        assert!(matches!(
            transport.read_report(report_ids::SENSOR_VALUES, &mut buf),
            Err(HidCommonError::Disconnected)
        ));
        assert!(matches!(
            transport.write_report(report_ids::RESET, &[]),
            Err(HidCommonError::Disconnected)
        ));
    }

    #[test]
    fn test_mock_backend_plug_and_unplug() {
        let mut backend = MockBackend::new();
        let handle = backend.handle();
        handle.add_device(HidDeviceInfo::new(0x1209, 0xb196, "mock:0"));

        let listed = backend.enumerate().expect("enumerate");
        assert_eq!(listed.len(), 1);
        assert!(backend.open(&listed[0]).is_ok());

        handle.remove_device("mock:0");
        assert!(backend.enumerate().expect("enumerate").is_empty());
        assert!(matches!(
            backend.open(&listed[0]),
            Err(HidCommonError::DeviceNotFound(_))
        ));
    }
}
