//! Typed request/response session over one open pad transport.
//!
//! `get` distinguishes three outcomes so callers can tell an idle stream from
//! a dead device: drain loops stop on [`ReadResult::NoData`], while
//! [`ReadResult::Failure`] means the session is gone. No retry policy lives
//! here; retries and backoff belong to callers.

use hid_pad_protocol::{FactoryResetReport, Report, ResetReport, SaveConfigurationReport};
use openpad_hid_common::{HidDeviceInfo, PadTransport, ReadOutcome};

/// Outcome of one typed report read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult<R> {
    /// A report was read and decoded.
    Success(R),
    /// Nothing queued right now; expected steady state, not an error.
    NoData,
    /// Transport-level failure: treat the session as dead.
    Failure,
}

impl<R> ReadResult<R> {
    pub fn success(self) -> Option<R> {
        match self {
            ReadResult::Success(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReadResult::Success(_))
    }
}

pub struct Reporter {
    transport: Box<dyn PadTransport>,
}

impl Reporter {
    pub fn new(transport: Box<dyn PadTransport>) -> Self {
        Self { transport }
    }

    /// Read one report of type `R`.
    ///
    /// A short or malformed payload counts as [`ReadResult::Failure`]: the
    /// device answered with something that is not the fixed-size report the
    /// protocol promises.
    pub fn get<R: Report>(&mut self) -> ReadResult<R> {
        let mut payload = vec![0u8; R::PAYLOAD_LEN];
        match self.transport.read_report(R::REPORT_ID, &mut payload) {
            Ok(ReadOutcome::WouldBlock) => ReadResult::NoData,
            Ok(ReadOutcome::Data(len)) => match R::decode(&payload[..len]) {
                Ok(report) => ReadResult::Success(report),
                Err(error) => {
                    tracing::debug!(
                        report_id = R::REPORT_ID,
                        %error,
                        "report decode failed"
                    );
                    ReadResult::Failure
                }
            },
            Err(error) => {
                tracing::debug!(report_id = R::REPORT_ID, %error, "report read failed");
                ReadResult::Failure
            }
        }
    }

    /// Write one report. Returns false on encode or transport failure.
    pub fn send<R: Report>(&mut self, report: &R) -> bool {
        let mut payload = vec![0u8; R::PAYLOAD_LEN];
        if report.encode(&mut payload).is_err() {
            return false;
        }
        match self.transport.write_report(R::REPORT_ID, &payload) {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!(report_id = R::REPORT_ID, %error, "report write failed");
                false
            }
        }
    }

    pub fn send_reset(&mut self) -> bool {
        self.send(&ResetReport)
    }

    pub fn send_save_configuration(&mut self) -> bool {
        self.send(&SaveConfigurationReport)
    }

    pub fn send_factory_reset(&mut self) -> bool {
        self.send(&FactoryResetReport)
    }

    pub fn info(&self) -> &HidDeviceInfo {
        self.transport.info()
    }
}
