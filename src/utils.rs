// Small I/O helpers shared by the index serializer and the read openers.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Little-endian binary writing for index serialization.
pub trait BinaryWrite: Write {
    fn write_u32_le(&mut self, v: u32) -> io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn write_u64_le(&mut self, v: u64) -> io::Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    fn write_u64_array_le(&mut self, vals: &[u64]) -> io::Result<()> {
        for &v in vals {
            self.write_u64_le(v)?;
        }
        Ok(())
    }

    /// Length-prefixed UTF-8 string.
    fn write_str_le(&mut self, s: &str) -> io::Result<()> {
        self.write_u32_le(s.len() as u32)?;
        self.write_all(s.as_bytes())
    }
}

impl<W: Write + ?Sized> BinaryWrite for W {}

/// Little-endian binary reading, mirror of [`BinaryWrite`].
pub trait BinaryRead: Read {
    fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64_le(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_u64_vec_le(&mut self, n: usize) -> io::Result<Vec<u64>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_u64_le()?);
        }
        Ok(out)
    }

    fn read_str_le(&mut self) -> io::Result<String> {
        let len = self.read_u32_le()? as usize;
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

impl<R: Read + ?Sized> BinaryRead for R {}

/// Open a file for reading, decompressing on the fly when the extension is `.gz`.
pub fn xzopen(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_scalars() {
        let mut buf = Vec::new();
        buf.write_u32_le(0xdead_beef).unwrap();
        buf.write_u64_le(42).unwrap();
        buf.write_str_le("281474976710699|seq1").unwrap();

        let mut r = &buf[..];
        assert_eq!(r.read_u32_le().unwrap(), 0xdead_beef);
        assert_eq!(r.read_u64_le().unwrap(), 42);
        assert_eq!(r.read_str_le().unwrap(), "281474976710699|seq1");
    }

    #[test]
    fn round_trip_array() {
        let vals = [1u64, u64::MAX, 7];
        let mut buf = Vec::new();
        buf.write_u64_array_le(&vals).unwrap();
        let mut r = &buf[..];
        assert_eq!(r.read_u64_vec_le(3).unwrap(), vals);
    }
}
