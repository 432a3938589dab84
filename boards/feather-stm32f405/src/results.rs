//! Hand-off from the measurement loop to the SD logger task

use core::cell::RefCell;
use critical_section::Mutex;
use defmt::Format;
use fieldlog_core::{FieldTestConfig, MeasurementResult};
use rtic_sync::channel::Sender;

/// Requests queued before the logger task falls behind
pub const QUEUE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Format)]
pub enum LogRequest {
    /// Finished measurement, stamped by the logger task
    Row(MeasurementResult),
    /// Test mode or location setting changed
    Settings(FieldTestConfig),
}

pub type LogSender = Sender<'static, LogRequest, QUEUE_LEN>;

static SENDER: Mutex<RefCell<Option<LogSender>>> = Mutex::new(RefCell::new(None));

pub fn install(tx: LogSender) {
    critical_section::with(|cs| {
        SENDER.borrow(cs).replace(Some(tx));
    });
}

/// Queue a request for the logger task, false if the queue is full
#[allow(dead_code)] // entry point for the measurement loop, which lives outside this crate
pub fn submit(request: LogRequest) -> bool {
    critical_section::with(|cs| {
        SENDER
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .is_some_and(|tx| tx.try_send(request).is_ok())
    })
}
