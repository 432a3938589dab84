//! SD card CSV logger
//!
//! Every public operation switches the storage power rail on, waits for the
//! card to settle, mounts the volume, does its work and unmounts again.
//! Nothing assumes the volume stays mounted between calls.
//!
//! Write failures are latched in an error flag the control loop can poll
//! after each row, a short write usually means the card is full.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Error as _, ErrorKind, Write};
use hal_abstractions::{DirEntry, LogVolume};
use heapless::Vec;

use super::csv::{CsvLayout, LogLine, LINE_TERMINATOR};
use super::naming::{self, LogFileName, SequenceScan};
use crate::config::{FieldTestConfig, LoggerConfig};
use crate::error::LogError;
use crate::measurement::MeasurementResult;

const SEPARATOR: &[u8] = b"=====================================================\r\n";

/// Chunk size for streaming files out
const READ_CHUNK: usize = 64;

/// Names collected per pass when clearing the card
const CLEAR_BATCH: usize = 16;

/// Mount, run `op`, unmount, whatever `op` returned
fn mounted<V, T, F>(volume: &mut V, op: F) -> Result<T, LogError>
where
    V: LogVolume,
    F: FnOnce(&mut V) -> Result<T, LogError>,
{
    if volume.mount().is_err() {
        error!("SD begin failed, make sure the card is formatted and inserted");
        return Err(LogError::MediaMountFailed);
    }
    let result = op(volume);
    volume.unmount();
    result
}

/// Copy a file to `out` in chunks, returns the number of bytes copied
fn stream_file<V, W>(volume: &mut V, name: &str, out: &mut W) -> Result<u32, LogError>
where
    V: LogVolume,
    W: Write,
{
    let mut buf = [0u8; READ_CHUNK];
    let mut offset = 0u32;
    loop {
        let n = match volume.read_at(name, offset, &mut buf) {
            Ok(n) => n,
            Err(_) if offset == 0 => {
                warn!("Failed to open {} for reading", name);
                return Err(LogError::FileOpenFailedForRead);
            }
            Err(_) => {
                warn!("Read of {} failed at offset {}", name, offset);
                return Err(LogError::FileOpenFailedForRead);
            }
        };
        if n == 0 {
            return Ok(offset);
        }
        out.write_all(&buf[..n]).map_err(|_| LogError::Output)?;
        offset += n as u32;
    }
}

/// Sequential CSV logger on removable storage
///
/// `V` is the card's root directory, `P` the pin switching the card's
/// power rail and `D` a blocking delay for the settle time.
pub struct SdLogger<V, P, D> {
    volume: V,
    power: P,
    delay: D,
    field: FieldTestConfig,
    config: LoggerConfig,
    /// Layout of the current file, fixed when its header was written
    layout: CsvLayout,
    file_name: Option<LogFileName>,
    rows: u16,
    error: bool,
}

impl<V, P, D> SdLogger<V, P, D>
where
    V: LogVolume,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(volume: V, power: P, delay: D, field: FieldTestConfig, config: LoggerConfig) -> Self {
        Self {
            volume,
            power,
            delay,
            layout: CsvLayout::select(&field),
            field,
            config,
            file_name: None,
            rows: 0,
            error: false,
        }
    }

    /// Latched write/media error
    pub fn error(&self) -> bool {
        self.error
    }

    pub fn clear_error(&mut self) {
        self.error = false;
    }

    /// Rows written to the current file
    pub fn rows_written(&self) -> u16 {
        self.rows
    }

    /// Name of the file rows are appended to, if one was created
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn layout(&self) -> CsvLayout {
        self.layout
    }

    pub fn volume(&self) -> &V {
        &self.volume
    }

    pub fn volume_mut(&mut self) -> &mut V {
        &mut self.volume
    }

    /// Change mode or location flag, takes effect with the next file
    pub fn set_field_config(&mut self, field: FieldTestConfig) {
        self.field = field;
    }

    pub fn release(self) -> (V, P, D) {
        (self.volume, self.power, self.delay)
    }

    /// Check that a card is present and mountable
    pub fn init(&mut self) -> Result<(), LogError> {
        let result = self
            .power_up()
            .and_then(|_| mounted(&mut self.volume, |_| Ok(())));
        match result {
            Ok(()) => {
                info!("SD card ready");
                Ok(())
            }
            Err(e) => {
                self.error = true;
                Err(e)
            }
        }
    }

    /// Start a new log file numbered one past the highest existing one
    ///
    /// Writes the header for the current mode and location setting. Rows
    /// appended afterwards use the same layout even if the configuration
    /// changes in between.
    pub fn create_file(&mut self) -> Result<(), LogError> {
        let result = self.power_up().and_then(|_| {
            let layout = CsvLayout::select(&self.field);
            mounted(&mut self.volume, |vol| {
                let name = Self::next_file_name(vol)?;
                info!("New filename = {}", name.as_str());

                let mut header = LogLine::new();
                header
                    .push_str(layout.header())
                    .and_then(|_| header.push_str(LINE_TERMINATOR))
                    .map_err(|_| LogError::LineTooLong)?;

                // never truncate a file the scan missed
                if !matches!(vol.exists(&name), Ok(false)) {
                    error!("{} already exists", name.as_str());
                    return Err(LogError::FileCreateFailed);
                }
                vol.create(&name).map_err(|_| {
                    error!("Can't create {}", name.as_str());
                    LogError::FileCreateFailed
                })?;
                info!("Writing header to {}", name.as_str());
                match vol.append(&name, header.as_bytes()) {
                    Ok(n) if n == header.len() => Ok((name, layout)),
                    _ => {
                        error!("Header write to {} failed", name.as_str());
                        Err(LogError::FileCreateFailed)
                    }
                }
            })
        });

        match result {
            Ok((name, layout)) => {
                self.file_name = Some(name);
                self.layout = layout;
                self.rows = 0;
                Ok(())
            }
            Err(e) => {
                self.error = true;
                Err(e)
            }
        }
    }

    fn next_file_name(vol: &mut V) -> Result<LogFileName, LogError> {
        let mut scan = SequenceScan::default();
        vol.read_root(|entry| {
            debug!("Found {}", entry.name.as_str());
            scan.observe(entry);
        })
        .map_err(|_| {
            error!("Can't open root");
            LogError::FileCreateFailed
        })?;
        scan.next_sequence()
            .and_then(naming::file_name)
            .ok_or(LogError::SequenceExhausted)
    }

    /// Append one measurement to the current file
    ///
    /// Creates the first file on demand. Every attempt, failed or not,
    /// counts towards the rotation limit; when it is reached the next file
    /// is started and the counter reset.
    pub fn write_entry(&mut self, result: &MeasurementResult) -> Result<(), LogError> {
        if self.file_name.is_none() {
            self.create_file()?;
        }

        let written = self.append_row(result);
        if written.is_err() {
            self.error = true;
        }

        self.rows += 1;
        if self.rows >= self.config.rows_per_file {
            info!("{} rows written, starting new file", self.rows);
            self.rows = 0;
            if let Err(e) = self.create_file() {
                error!("File rollover failed: {}", e);
            }
        }
        written
    }

    fn append_row(&mut self, result: &MeasurementResult) -> Result<(), LogError> {
        let Some(name) = self.file_name.clone() else {
            return Err(LogError::FileWriteFailed);
        };

        let mut line = LogLine::new();
        self.layout.format_row(result, &mut line)?;
        debug!("Writing: {}", line.as_str());
        line.push_str(LINE_TERMINATOR)
            .map_err(|_| LogError::LineTooLong)?;

        self.power_up()?;
        mounted(&mut self.volume, |vol| {
            match vol.exists(&name) {
                Ok(true) => debug!("Found {}", name.as_str()),
                _ => warn!("Can't find {}", name.as_str()),
            }

            match vol.append(&name, line.as_bytes()) {
                Ok(n) if n == line.len() => Ok(()),
                Ok(n) => {
                    error!(
                        "Short write to {}: {} of {} bytes, card full?",
                        name.as_str(),
                        n,
                        line.len()
                    );
                    Err(LogError::ShortWrite {
                        expected: line.len(),
                        written: n,
                    })
                }
                Err(e) => {
                    if e.kind() == ErrorKind::OutOfMemory {
                        error!("Error writing to {}, card full", name.as_str());
                    } else {
                        error!("Error writing to {}", name.as_str());
                    }
                    Err(LogError::FileWriteFailed)
                }
            }
        })
    }

    /// Stream every log file, oldest first, to `out`
    ///
    /// Stops at the first missing sequence number. Files that can't be
    /// read are skipped. Returns the number of files found.
    pub fn dump_all<W: Write>(&mut self, out: &mut W) -> Result<usize, LogError> {
        self.power_up()?;
        mounted(&mut self.volume, |vol| {
            let mut found = 0;
            for seq in 0..=naming::MAX_SEQUENCE {
                let Some(name) = naming::file_name(seq) else {
                    break;
                };
                if !vol.exists(&name).unwrap_or(false) {
                    break;
                }
                found += 1;

                out.write_all(SEPARATOR).map_err(|_| LogError::Output)?;
                out.write_all(name.as_bytes())
                    .and_then(|_| out.write_all(LINE_TERMINATOR.as_bytes()))
                    .map_err(|_| LogError::Output)?;
                match stream_file(vol, &name, out) {
                    Ok(_) => {}
                    Err(LogError::FileOpenFailedForRead) => continue,
                    Err(e) => return Err(e),
                }
                out.write_all(SEPARATOR).map_err(|_| LogError::Output)?;
                out.flush().map_err(|_| LogError::Output)?;
            }
            Ok(found)
        })
    }

    /// Stream a single file to `out`, returns its size
    pub fn dump_file<W: Write>(&mut self, name: &str, out: &mut W) -> Result<u32, LogError> {
        info!("Reading file: {}", name);
        self.power_up()?;
        mounted(&mut self.volume, |vol| stream_file(vol, name, out))
    }

    /// Write a listing of the root directory to `out`
    ///
    /// Files as `name<TAB><TAB>size`, directories as `name/`. Returns the
    /// number of entries.
    pub fn list_root<W: Write>(&mut self, out: &mut W) -> Result<usize, LogError> {
        self.power_up()?;
        mounted(&mut self.volume, |vol| {
            let mut count = 0;
            let mut sink = Ok(());
            vol.read_root(|entry| {
                count += 1;
                if sink.is_ok() {
                    sink = write_entry_line(out, entry);
                }
            })
            .map_err(|_| LogError::FileOpenFailedForRead)?;
            sink.map(|_| count)
        })
    }

    /// Delete every file in the root directory
    ///
    /// Directories are left alone. Returns how many files were removed,
    /// calling it on an empty card is a no-op returning 0.
    pub fn clear_all(&mut self) -> Result<usize, LogError> {
        self.power_up()?;
        let removed = mounted(&mut self.volume, |vol| {
            let mut removed = 0;
            loop {
                let mut batch: Vec<hal_abstractions::EntryName, CLEAR_BATCH> = Vec::new();
                vol.read_root(|entry| {
                    if !entry.is_dir {
                        // a full batch is fine, the next pass picks up the rest
                        let _ = batch.push(entry.name.clone());
                    }
                })
                .map_err(|_| LogError::FileOpenFailedForRead)?;

                if batch.is_empty() {
                    return Ok(removed);
                }
                for name in &batch {
                    info!("Delete {}", name.as_str());
                    vol.remove(name).map_err(|_| {
                        error!("Can't delete {}", name.as_str());
                        LogError::FileRemoveFailed
                    })?;
                    removed += 1;
                }
            }
        })?;

        if removed == 0 {
            info!("No files found");
        }
        self.file_name = None;
        self.rows = 0;
        Ok(removed)
    }

    fn power_up(&mut self) -> Result<(), LogError> {
        self.power.set_high().map_err(|_| LogError::PowerRail)?;
        self.delay.delay_ms(self.config.power_settle_ms);
        Ok(())
    }
}

fn write_entry_line<W: Write>(out: &mut W, entry: &DirEntry) -> Result<(), LogError> {
    let written = if entry.is_dir {
        out.write_all(entry.name.as_bytes())
            .and_then(|_| out.write_all(b"/\r\n"))
    } else {
        let mut size: heapless::String<12> = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut size, format_args!("{}", entry.size));
        out.write_all(entry.name.as_bytes())
            .and_then(|_| out.write_all(b"\t\t"))
            .and_then(|_| out.write_all(size.as_bytes()))
            .and_then(|_| out.write_all(LINE_TERMINATOR.as_bytes()))
    };
    written.map_err(|_| LogError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestMode;
    use crate::measurement::Location;
    use core::convert::Infallible;
    use std::collections::BTreeMap;
    use std::string::String;
    use std::vec::Vec as StdVec;

    #[derive(Debug)]
    struct FakeError(ErrorKind);

    impl core::fmt::Display for FakeError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl core::error::Error for FakeError {}

    impl embedded_io::Error for FakeError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Root directory kept in memory
    struct FakeVolume {
        card_present: bool,
        mounted: bool,
        mounts: usize,
        unmounts: usize,
        files: BTreeMap<String, StdVec<u8>>,
        dirs: StdVec<String>,
        /// Bytes left on the card, unlimited when `None`
        space: Option<usize>,
        fail_create: bool,
        fail_root: bool,
        /// Names left out of root listings
        hidden: StdVec<String>,
        /// File whose appends are refused
        locked: Option<String>,
    }

    impl FakeVolume {
        fn new() -> Self {
            Self {
                card_present: true,
                mounted: false,
                mounts: 0,
                unmounts: 0,
                files: BTreeMap::new(),
                dirs: StdVec::new(),
                space: None,
                fail_create: false,
                fail_root: false,
                hidden: StdVec::new(),
                locked: None,
            }
        }

        fn with_logs(count: u16) -> Self {
            let mut vol = Self::new();
            for seq in 0..count {
                let name = naming::file_name(seq).unwrap();
                vol.files.insert(name.as_str().into(), b"old\r\n".to_vec());
            }
            vol
        }

        fn text(&self, name: &str) -> String {
            String::from_utf8(self.files[name].clone()).unwrap()
        }

        fn check_mounted(&self) -> Result<(), FakeError> {
            if self.mounted {
                Ok(())
            } else {
                Err(FakeError(ErrorKind::NotConnected))
            }
        }
    }

    impl LogVolume for FakeVolume {
        type Error = FakeError;

        fn mount(&mut self) -> Result<(), Self::Error> {
            if !self.card_present {
                return Err(FakeError(ErrorKind::NotFound));
            }
            assert!(!self.mounted, "mounted twice");
            self.mounted = true;
            self.mounts += 1;
            Ok(())
        }

        fn unmount(&mut self) {
            assert!(self.mounted, "unmount without mount");
            self.mounted = false;
            self.unmounts += 1;
        }

        fn read_root<F>(&mut self, mut f: F) -> Result<(), Self::Error>
        where
            F: FnMut(&DirEntry),
        {
            self.check_mounted()?;
            if self.fail_root {
                return Err(FakeError(ErrorKind::Other));
            }
            for dir in &self.dirs {
                f(&DirEntry {
                    name: dir.as_str().try_into().unwrap(),
                    is_dir: true,
                    size: 0,
                });
            }
            for (name, data) in &self.files {
                if self.hidden.contains(name) {
                    continue;
                }
                f(&DirEntry {
                    name: name.as_str().try_into().unwrap(),
                    is_dir: false,
                    size: data.len() as u32,
                });
            }
            Ok(())
        }

        fn exists(&mut self, name: &str) -> Result<bool, Self::Error> {
            self.check_mounted()?;
            Ok(self.files.contains_key(name))
        }

        fn create(&mut self, name: &str) -> Result<(), Self::Error> {
            self.check_mounted()?;
            if self.fail_create {
                return Err(FakeError(ErrorKind::OutOfMemory));
            }
            self.files.insert(name.into(), StdVec::new());
            Ok(())
        }

        fn append(&mut self, name: &str, data: &[u8]) -> Result<usize, Self::Error> {
            self.check_mounted()?;
            if self.locked.as_deref() == Some(name) {
                return Err(FakeError(ErrorKind::OutOfMemory));
            }
            let file = self
                .files
                .get_mut(name)
                .ok_or(FakeError(ErrorKind::NotFound))?;
            let n = self.space.map_or(data.len(), |left| left.min(data.len()));
            file.extend_from_slice(&data[..n]);
            if let Some(left) = self.space.as_mut() {
                *left -= n;
            }
            Ok(n)
        }

        fn read_at(&mut self, name: &str, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error> {
            self.check_mounted()?;
            let file = self.files.get(name).ok_or(FakeError(ErrorKind::NotFound))?;
            let start = (offset as usize).min(file.len());
            let n = (file.len() - start).min(buf.len());
            buf[..n].copy_from_slice(&file[start..start + n]);
            Ok(n)
        }

        fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
            self.check_mounted()?;
            self.files
                .remove(name)
                .map(|_| ())
                .ok_or(FakeError(ErrorKind::NotFound))
        }
    }

    #[derive(Default)]
    struct FakePin {
        high: bool,
    }

    impl embedded_hal::digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDelay {
        total_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    /// Serial port stand-in
    #[derive(Default)]
    struct Capture(StdVec<u8>);

    impl embedded_io::ErrorType for Capture {
        type Error = Infallible;
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    type TestLogger = SdLogger<FakeVolume, FakePin, FakeDelay>;

    fn logger(volume: FakeVolume, test_mode: TestMode, location_on: bool) -> TestLogger {
        SdLogger::new(
            volume,
            FakePin::default(),
            FakeDelay::default(),
            FieldTestConfig {
                test_mode,
                location_on,
            },
            LoggerConfig::default(),
        )
    }

    fn sample() -> MeasurementResult {
        MeasurementResult {
            year: 2024,
            month: 11,
            day: 2,
            hour: 18,
            min: 40,
            mode: 0,
            gw: 3,
            location: Some(Location { lat: 1.5, lng: 103.75 }),
            rx_rssi: -72,
            rx_snr: 9,
            demod: 20,
            lost: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_init_powers_and_mounts() {
        let mut log = logger(FakeVolume::new(), TestMode::LinkCheck, false);
        log.init().unwrap();
        assert!(!log.error());

        let (vol, pin, delay) = log.release();
        assert_eq!((vol.mounts, vol.unmounts), (1, 1));
        assert!(!vol.mounted);
        assert!(pin.high);
        assert!(delay.total_ns >= 50_000_000);
    }

    #[test]
    fn test_init_without_card() {
        let mut vol = FakeVolume::new();
        vol.card_present = false;
        let mut log = logger(vol, TestMode::LinkCheck, false);
        assert_eq!(log.init(), Err(LogError::MediaMountFailed));
        assert!(log.error());
    }

    #[test]
    fn test_create_first_file() {
        let mut log = logger(FakeVolume::new(), TestMode::LinkCheck, false);
        log.create_file().unwrap();
        assert_eq!(log.file_name(), Some("0000-log.csv"));
        assert_eq!(
            log.volume().text("0000-log.csv"),
            "\"time\";\"Mode\";\"Gw\";\"RX RSSI\";\"RX SNR\";\"Demod\";\"Lost\"\r\n"
        );
    }

    #[test]
    fn test_create_continues_sequence() {
        let mut vol = FakeVolume::with_logs(6);
        vol.dirs.push("0042-log.csv".into());
        vol.files.insert("README.TXT".into(), StdVec::new());
        let mut log = logger(vol, TestMode::FieldTester, false);

        log.create_file().unwrap();
        assert_eq!(log.file_name(), Some("0006-log.csv"));
        assert_eq!(log.layout(), CsvLayout::FieldTester);
        assert!(log.volume().text("0006-log.csv").starts_with("\"time\";\"Mode\";\"Gw\";\"Lat\""));
        assert_eq!(log.volume().text("0005-log.csv"), "old\r\n");
    }

    #[test]
    fn test_create_fails_on_full_card() {
        let mut vol = FakeVolume::new();
        vol.fail_create = true;
        let mut log = logger(vol, TestMode::P2p, true);
        assert_eq!(log.create_file(), Err(LogError::FileCreateFailed));
        assert!(log.error());
        assert_eq!(log.file_name(), None);
        assert!(!log.volume().mounted);
    }

    #[test]
    fn test_create_fails_when_sequence_used_up() {
        let mut vol = FakeVolume::new();
        vol.files.insert("9999-LOG.CSV".into(), StdVec::new());
        let mut log = logger(vol, TestMode::P2p, false);
        assert_eq!(log.create_file(), Err(LogError::SequenceExhausted));
    }

    #[test]
    fn test_create_keeps_logs_when_root_unreadable() {
        let mut vol = FakeVolume::with_logs(3);
        vol.fail_root = true;
        let mut log = logger(vol, TestMode::P2p, false);

        assert_eq!(log.create_file(), Err(LogError::FileCreateFailed));
        assert!(log.error());
        assert_eq!(log.file_name(), None);
        assert_eq!(log.volume().text("0000-log.csv"), "old\r\n");
        assert_eq!(log.volume().files.len(), 3);
        assert!(!log.volume().mounted);
    }

    #[test]
    fn test_create_refuses_to_truncate_existing_name() {
        let mut vol = FakeVolume::with_logs(2);
        vol.hidden.push("0001-log.csv".into());
        let mut log = logger(vol, TestMode::P2p, false);

        assert_eq!(log.create_file(), Err(LogError::FileCreateFailed));
        assert_eq!(log.volume().text("0001-log.csv"), "old\r\n");
    }

    #[test]
    fn test_write_entry_appends_row() {
        let mut log = logger(FakeVolume::new(), TestMode::LinkCheck, true);
        log.write_entry(&sample()).unwrap();

        assert_eq!(log.file_name(), Some("0000-log.csv"));
        assert_eq!(log.rows_written(), 1);
        assert!(!log.error());
        assert_eq!(
            log.volume().text("0000-log.csv"),
            "\"time\";\"Mode\";\"Gw\";\"Lat\";\"Lng\";\"RX RSSI\";\"RX SNR\";\"Demod\";\"Lost\"\r\n\
             2024-11-02-18-40;0;3;1.500000;103.750000;-72;9;20;0\r\n"
        );
        assert_eq!(log.volume().mounts, log.volume().unmounts);
    }

    #[test]
    fn test_rotation_after_row_limit() {
        let mut log = logger(FakeVolume::new(), TestMode::P2p, false);
        for _ in 0..299 {
            log.write_entry(&sample()).unwrap();
        }
        assert_eq!(log.rows_written(), 299);
        assert_eq!(log.file_name(), Some("0000-log.csv"));

        log.write_entry(&sample()).unwrap();
        assert_eq!(log.rows_written(), 0);
        assert_eq!(log.file_name(), Some("0001-log.csv"));

        let first = log.volume().text("0000-log.csv");
        assert_eq!(first.lines().count(), 301);
        assert_eq!(log.volume().text("0001-log.csv"), "\"time\";\"Mode\";\"RX RSSI\";\"RX SNR\"\r\n");

        log.write_entry(&sample()).unwrap();
        assert_eq!(log.rows_written(), 1);
        assert_eq!(log.volume().text("0001-log.csv").lines().count(), 2);
    }

    #[test]
    fn test_short_write_sets_error() {
        let mut log = logger(FakeVolume::new(), TestMode::P2p, false);
        log.create_file().unwrap();
        log.volume_mut().space = Some(10);

        let line_len = "2024-11-02-18-40;0;-72;9\r\n".len();
        assert_eq!(
            log.write_entry(&sample()),
            Err(LogError::ShortWrite {
                expected: line_len,
                written: 10
            })
        );
        assert!(log.error());
        assert_eq!(log.rows_written(), 1);

        log.clear_error();
        assert!(!log.error());
    }

    #[test]
    fn test_append_failure_sets_error_and_counts_row() {
        let mut log = logger(FakeVolume::new(), TestMode::LinkCheck, false);
        log.create_file().unwrap();
        log.volume_mut().locked = Some("0000-log.csv".into());

        assert_eq!(log.write_entry(&sample()), Err(LogError::FileWriteFailed));
        assert!(log.error());
        assert_eq!(log.rows_written(), 1);
        assert!(!log.volume().mounted);
    }

    #[test]
    fn test_failed_rows_still_rotate() {
        let mut log = logger(FakeVolume::new(), TestMode::LinkCheck, false);
        log.create_file().unwrap();
        log.volume_mut().locked = Some("0000-log.csv".into());
        for _ in 0..300 {
            let _ = log.write_entry(&sample());
        }
        assert_eq!(log.rows_written(), 0);
        assert_eq!(log.file_name(), Some("0001-log.csv"));
    }

    #[test]
    fn test_layout_fixed_until_next_file() {
        let mut log = logger(FakeVolume::new(), TestMode::P2p, false);
        log.create_file().unwrap();
        log.set_field_config(FieldTestConfig {
            test_mode: TestMode::LinkCheck,
            location_on: true,
        });
        log.write_entry(&sample()).unwrap();
        assert!(log.volume().text("0000-log.csv").ends_with("2024-11-02-18-40;0;-72;9\r\n"));

        log.create_file().unwrap();
        assert_eq!(log.layout(), CsvLayout::LinkCheckLocation);
    }

    #[test]
    fn test_dump_all_stops_at_gap() {
        let mut vol = FakeVolume::with_logs(2);
        vol.files.insert("0003-log.csv".into(), b"skipped\r\n".to_vec());
        let mut log = logger(vol, TestMode::LinkCheck, false);

        let mut out = Capture::default();
        assert_eq!(log.dump_all(&mut out), Ok(2));

        let text = String::from_utf8(out.0).unwrap();
        let sep = "=====================================================\r\n";
        assert_eq!(
            text,
            format!("{sep}0000-log.csv\r\nold\r\n{sep}{sep}0001-log.csv\r\nold\r\n{sep}")
        );
        assert!(!log.volume().mounted);
    }

    #[test]
    fn test_dump_file_streams_verbatim() {
        let mut vol = FakeVolume::new();
        let big: StdVec<u8> = (0..200u8).collect();
        vol.files.insert("0000-log.csv".into(), big.clone());
        let mut log = logger(vol, TestMode::LinkCheck, false);

        let mut out = Capture::default();
        assert_eq!(log.dump_file("0000-log.csv", &mut out), Ok(200));
        assert_eq!(out.0, big);

        assert_eq!(
            log.dump_file("0001-log.csv", &mut out),
            Err(LogError::FileOpenFailedForRead)
        );
    }

    #[test]
    fn test_list_root() {
        let mut vol = FakeVolume::with_logs(1);
        vol.dirs.push("SYSTEM~1".into());
        let mut log = logger(vol, TestMode::LinkCheck, false);

        let mut out = Capture::default();
        assert_eq!(log.list_root(&mut out), Ok(2));
        assert_eq!(
            String::from_utf8(out.0).unwrap(),
            "SYSTEM~1/\r\n0000-log.csv\t\t5\r\n"
        );
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let mut vol = FakeVolume::with_logs(20);
        vol.files.insert("NOTES.TXT".into(), StdVec::new());
        vol.dirs.push("SYSTEM~1".into());
        let mut log = logger(vol, TestMode::LinkCheck, false);
        log.create_file().unwrap();

        assert_eq!(log.clear_all(), Ok(22));
        assert!(log.volume().files.is_empty());
        assert_eq!(log.volume().dirs.len(), 1);
        assert_eq!(log.file_name(), None);

        assert_eq!(log.clear_all(), Ok(0));
        assert!(log.volume().files.is_empty());
        assert_eq!(log.volume().mounts, log.volume().unmounts);
    }

    #[test]
    fn test_write_after_clear_starts_over() {
        let mut log = logger(FakeVolume::with_logs(3), TestMode::LinkCheck, false);
        log.create_file().unwrap();
        assert_eq!(log.file_name(), Some("0003-log.csv"));

        log.clear_all().unwrap();
        log.write_entry(&sample()).unwrap();
        assert_eq!(log.file_name(), Some("0000-log.csv"));
    }
}
