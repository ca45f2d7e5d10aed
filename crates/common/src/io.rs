//! Single-byte channel helpers and the end-of-input policy.

use std::io::{self, ErrorKind, Read, Write};
use std::str::FromStr;

/// What an `Input` instruction stores when the input channel is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EofPolicy {
    /// Store 0 in the current cell.
    #[default]
    Zero,
    /// Leave the current cell as it was.
    Unchanged,
    /// Store 255 (-1 as a signed byte).
    MinusOne,
}

impl EofPolicy {
    /// Value to store on end of input, or `None` to leave the cell alone.
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Zero => Some(0),
            Self::Unchanged => None,
            Self::MinusOne => Some(0xFF),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Unchanged => "unchanged",
            Self::MinusOne => "minus-one",
        }
    }
}

impl FromStr for EofPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" | "0" => Ok(Self::Zero),
            "unchanged" => Ok(Self::Unchanged),
            "minus-one" | "-1" => Ok(Self::MinusOne),
            other => Err(format!(
                "unknown EOF policy '{other}' (expected zero, unchanged or minus-one)"
            )),
        }
    }
}

/// Read one byte, retrying interrupted reads. `Ok(None)` is end of input.
pub fn read_byte<R: Read + ?Sized>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Write one byte. `write_all` already retries interrupted writes.
pub fn write_byte<W: Write + ?Sized>(output: &mut W, byte: u8) -> io::Result<()> {
    output.write_all(&[byte])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_until_end() {
        let mut input: &[u8] = b"AB";
        assert_eq!(read_byte(&mut input).unwrap(), Some(b'A'));
        assert_eq!(read_byte(&mut input).unwrap(), Some(b'B'));
        assert_eq!(read_byte(&mut input).unwrap(), None);
        assert_eq!(read_byte(&mut input).unwrap(), None);
    }

    #[test]
    fn interrupted_read_is_retried() {
        struct Flaky {
            interrupted: bool,
        }
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(ErrorKind::Interrupted.into());
                }
                buf[0] = b'x';
                Ok(1)
            }
        }

        let mut input = Flaky { interrupted: false };
        assert_eq!(read_byte(&mut input).unwrap(), Some(b'x'));
    }

    #[test]
    fn write_appends() {
        let mut out = Vec::new();
        write_byte(&mut out, b'h').unwrap();
        write_byte(&mut out, b'i').unwrap();
        assert_eq!(out, b"hi");
    }

    #[test]
    fn eof_policy_values() {
        assert_eq!(EofPolicy::default(), EofPolicy::Zero);
        assert_eq!(EofPolicy::Zero.value(), Some(0));
        assert_eq!(EofPolicy::Unchanged.value(), None);
        assert_eq!(EofPolicy::MinusOne.value(), Some(255));
    }

    #[test]
    fn eof_policy_from_str() {
        assert_eq!("zero".parse::<EofPolicy>(), Ok(EofPolicy::Zero));
        assert_eq!("unchanged".parse::<EofPolicy>(), Ok(EofPolicy::Unchanged));
        assert_eq!("minus-one".parse::<EofPolicy>(), Ok(EofPolicy::MinusOne));
        assert!("sometimes".parse::<EofPolicy>().is_err());
    }
}
