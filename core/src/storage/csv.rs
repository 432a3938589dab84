//! CSV header and row layouts
//!
//! Columns are separated by `;`, header cells are quoted, the timestamp is
//! written as `YYYY-MM-DD-hh-mm` and positions with six decimals.

use core::fmt::Write as _;

use heapless::String;

use crate::config::{FieldTestConfig, TestMode};
use crate::error::LogError;
use crate::measurement::MeasurementResult;

/// Every line, header included, ends like this
pub const LINE_TERMINATOR: &str = "\r\n";

/// Room for the longest row plus terminator
pub const LINE_CAPACITY: usize = 192;

pub type LogLine = String<LINE_CAPACITY>;

/// Column layout of a log file, picked once when the file is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CsvLayout {
    LinkCheck,
    LinkCheckLocation,
    /// Field tester modes always carry the position
    FieldTester,
    P2p,
    P2pLocation,
}

impl CsvLayout {
    pub fn select(config: &FieldTestConfig) -> Self {
        match (config.test_mode, config.location_on) {
            (TestMode::LinkCheck, true) => Self::LinkCheckLocation,
            (TestMode::LinkCheck, false) => Self::LinkCheck,
            (TestMode::FieldTester | TestMode::FieldTesterV2, _) => Self::FieldTester,
            (TestMode::P2p, true) => Self::P2pLocation,
            (TestMode::P2p, false) => Self::P2p,
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Self::LinkCheckLocation => {
                r#""time";"Mode";"Gw";"Lat";"Lng";"RX RSSI";"RX SNR";"Demod";"Lost""#
            }
            Self::LinkCheck => r#""time";"Mode";"Gw";"RX RSSI";"RX SNR";"Demod";"Lost""#,
            Self::FieldTester => {
                r#""time";"Mode";"Gw";"Lat";"Lng";"min RSSI";"max RSSI";"RX RSSI";"RX SNR";"min Dist";"max Dist""#
            }
            Self::P2pLocation => r#""time";"Mode";"Lat";"Lng";"RX RSSI";"RX SNR""#,
            Self::P2p => r#""time";"Mode";"RX RSSI";"RX SNR""#,
        }
    }

    pub fn columns(self) -> usize {
        self.header().split(';').count()
    }

    /// Format one row, without line terminator, into `line`
    pub fn format_row(self, r: &MeasurementResult, line: &mut LogLine) -> Result<(), LogError> {
        line.clear();
        self.write_row(r, line).map_err(|_| LogError::LineTooLong)
    }

    fn write_row(self, r: &MeasurementResult, line: &mut LogLine) -> core::fmt::Result {
        write!(
            line,
            "{:04}-{:02}-{:02}-{:02}-{:02};{}",
            r.year, r.month, r.day, r.hour, r.min, r.mode
        )?;

        let (lat, lng) = r.lat_lng();
        match self {
            Self::LinkCheckLocation => write!(
                line,
                ";{};{:.6};{:.6};{};{};{};{}",
                r.gw, lat, lng, r.rx_rssi, r.rx_snr, r.demod, r.lost
            ),
            Self::LinkCheck => write!(
                line,
                ";{};{};{};{};{}",
                r.gw, r.rx_rssi, r.rx_snr, r.demod, r.lost
            ),
            Self::FieldTester => write!(
                line,
                ";{};{:.6};{:.6};{};{};{};{};{};{}",
                r.gw,
                lat,
                lng,
                r.min_rssi,
                r.max_rssi,
                r.rx_rssi,
                r.rx_snr,
                r.min_dst,
                r.max_dst
            ),
            Self::P2pLocation => write!(line, ";{:.6};{:.6};{};{}", lat, lng, r.rx_rssi, r.rx_snr),
            Self::P2p => write!(line, ";{};{}", r.rx_rssi, r.rx_snr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Location;

    const ALL: [CsvLayout; 5] = [
        CsvLayout::LinkCheck,
        CsvLayout::LinkCheckLocation,
        CsvLayout::FieldTester,
        CsvLayout::P2p,
        CsvLayout::P2pLocation,
    ];

    fn sample() -> MeasurementResult {
        MeasurementResult {
            year: 2024,
            month: 3,
            day: 7,
            hour: 9,
            min: 5,
            mode: 0,
            gw: 2,
            location: Some(Location { lat: 14.5, lng: -121.25 }),
            rx_rssi: -97,
            rx_snr: -3,
            min_rssi: -110,
            max_rssi: -85,
            min_dst: 120,
            max_dst: 4350,
            demod: 12,
            lost: 1,
        }
    }

    fn row(layout: CsvLayout, r: &MeasurementResult) -> LogLine {
        let mut line = LogLine::new();
        layout.format_row(r, &mut line).unwrap();
        line
    }

    #[test]
    fn test_select() {
        let cfg = |test_mode, location_on| FieldTestConfig {
            test_mode,
            location_on,
        };
        assert_eq!(CsvLayout::select(&cfg(TestMode::LinkCheck, true)), CsvLayout::LinkCheckLocation);
        assert_eq!(CsvLayout::select(&cfg(TestMode::LinkCheck, false)), CsvLayout::LinkCheck);
        assert_eq!(CsvLayout::select(&cfg(TestMode::FieldTester, false)), CsvLayout::FieldTester);
        assert_eq!(CsvLayout::select(&cfg(TestMode::FieldTesterV2, true)), CsvLayout::FieldTester);
        assert_eq!(CsvLayout::select(&cfg(TestMode::P2p, true)), CsvLayout::P2pLocation);
        assert_eq!(CsvLayout::select(&cfg(TestMode::P2p, false)), CsvLayout::P2p);
    }

    #[test]
    fn test_link_check_rows() {
        assert_eq!(
            row(CsvLayout::LinkCheckLocation, &sample()),
            "2024-03-07-09-05;0;2;14.500000;-121.250000;-97;-3;12;1"
        );
        assert_eq!(
            row(CsvLayout::LinkCheck, &sample()),
            "2024-03-07-09-05;0;2;-97;-3;12;1"
        );
    }

    #[test]
    fn test_field_tester_row() {
        let r = MeasurementResult {
            mode: 3,
            ..sample()
        };
        assert_eq!(
            row(CsvLayout::FieldTester, &r),
            "2024-03-07-09-05;3;2;14.500000;-121.250000;-110;-85;-97;-3;120;4350"
        );
    }

    #[test]
    fn test_p2p_rows() {
        let r = MeasurementResult {
            mode: 2,
            ..sample()
        };
        assert_eq!(
            row(CsvLayout::P2pLocation, &r),
            "2024-03-07-09-05;2;14.500000;-121.250000;-97;-3"
        );
        assert_eq!(row(CsvLayout::P2p, &r), "2024-03-07-09-05;2;-97;-3");
    }

    #[test]
    fn test_missing_location_prints_zeros() {
        let r = MeasurementResult {
            location: None,
            ..sample()
        };
        assert_eq!(
            row(CsvLayout::P2pLocation, &r),
            "2024-03-07-09-05;0;0.000000;0.000000;-97;-3"
        );
    }

    #[test]
    fn test_row_columns_match_header() {
        for layout in ALL {
            let line = row(layout, &sample());
            assert_eq!(
                line.split(';').count(),
                layout.columns(),
                "column mismatch for {:?}",
                layout
            );
            assert!(layout.header().starts_with("\"time\";\"Mode\""));
        }
    }

    #[test]
    fn test_widest_row_fits() {
        let r = MeasurementResult {
            year: 9999,
            mode: 255,
            gw: 255,
            location: Some(Location {
                lat: -179.999_99,
                lng: -179.999_99,
            }),
            rx_rssi: i16::MIN,
            rx_snr: i8::MIN,
            min_rssi: i16::MIN,
            max_rssi: i16::MIN,
            min_dst: u32::MAX,
            max_dst: u32::MAX,
            demod: 255,
            lost: 255,
            ..sample()
        };
        for layout in ALL {
            let line = row(layout, &r);
            assert!(line.len() + LINE_TERMINATOR.len() <= LINE_CAPACITY);
        }
    }
}
