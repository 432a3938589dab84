//! Storage logging
//!
//! Measurement rows go to sequentially numbered CSV files on the SD card.
//! [`SdLogger`] drives the card through [`hal_abstractions::LogVolume`];
//! [`csv`] and [`naming`] hold the file formats.

pub mod csv;
mod logger;
pub mod naming;

pub use csv::CsvLayout;
pub use logger::SdLogger;
pub use naming::LogFileName;
