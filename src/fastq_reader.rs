// FASTQ reader built on bio::io::fastq, with gzip auto-detection by file
// extension and batch reading to feed the parallel classify driver.

use crate::read::ReadSeq;
use crate::utils::xzopen;
use bio::io::fastq;
use std::io::{self, BufReader, Read};
use std::path::Path;

pub struct FastqReader {
    records: fastq::Records<BufReader<Box<dyn Read + Send>>>,
}

impl FastqReader {
    /// Open a FASTQ file (.fq, .fastq, optionally .gz).
    pub fn open(path: &Path) -> io::Result<Self> {
        let reader = xzopen(path)?;
        Ok(FastqReader {
            records: fastq::Reader::new(reader).records(),
        })
    }

    /// Read up to `max` reads, already encoded with their reverse
    /// complements. An empty batch means EOF.
    pub fn next_batch(&mut self, max: usize) -> io::Result<Vec<ReadSeq>> {
        let mut batch = Vec::with_capacity(max.min(1024));
        while batch.len() < max {
            match self.records.next() {
                Some(Ok(record)) => {
                    batch.push(ReadSeq::from_bytes(record.id().to_string(), record.seq()));
                }
                Some(Err(e)) => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string()));
                }
                None => break,
            }
        }
        Ok(batch)
    }
}
