//! Byte sink that forwards text to the RTT log, one defmt frame per line

use core::convert::Infallible;

use heapless::Vec;

const LINE_LEN: usize = 128;

#[derive(Default)]
pub struct RttConsole {
    line: Vec<u8, LINE_LEN>,
}

impl RttConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self) {
        let text = self.line.strip_suffix(b"\r").unwrap_or(&self.line[..]);
        match core::str::from_utf8(text) {
            Ok(s) => defmt::println!("{=str}", s),
            Err(_) => defmt::println!("{=[u8]}", text),
        }
        self.line.clear();
    }
}

impl embedded_io::ErrorType for RttConsole {
    type Error = Infallible;
}

impl embedded_io::Write for RttConsole {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &b in buf {
            if b == b'\n' {
                self.emit();
                continue;
            }
            if self.line.push(b).is_err() {
                self.emit();
                // line was just emptied
                let _ = self.line.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if !self.line.is_empty() {
            self.emit();
        }
        Ok(())
    }
}
