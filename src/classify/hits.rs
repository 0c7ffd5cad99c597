// Partial-hit containers for one mate.

use crate::fm_index::SaRange;
use crate::index::Coord;

/// One maximal exact match between a read substring and the index on one
/// strand.
#[derive(Debug, Clone, Default)]
pub struct PartialHit {
    /// Start of the match counted from the right end of the read.
    pub bw_off: usize,
    /// Match length in bases; 0 when the cursor base could not extend at all.
    pub len: usize,
    pub range: SaRange,
    /// Reference coordinates, filled by the materializer.
    pub coords: Vec<Coord>,
}

impl PartialHit {
    /// Number of reference occurrences.
    #[inline]
    pub fn size(&self) -> u64 {
        self.range.size()
    }

    /// Left end of the match in read coordinates.
    #[inline]
    pub fn read_off(&self, read_len: usize) -> usize {
        read_len - self.bw_off - self.len
    }
}

/// Ordered partial hits for one strand of one mate, with the search cursor.
/// Spent hits are recycled through `spare` so their coordinate buffers are
/// reused across reads.
#[derive(Debug, Default)]
pub struct ReadBwtHit {
    pub fw: bool,
    pub read_len: usize,
    /// Next unsearched read position.
    pub cursor: usize,
    pub done: bool,
    pub hits: Vec<PartialHit>,
    spare: Vec<PartialHit>,
}

impl ReadBwtHit {
    pub fn reset(&mut self, fw: bool, read_len: usize) {
        self.fw = fw;
        self.read_len = read_len;
        self.cursor = 0;
        self.done = false;
        self.spare.extend(self.hits.drain(..).map(|mut h| {
            h.coords.clear();
            h
        }));
    }

    /// A cleared hit, reusing a recycled allocation when one is available.
    pub fn take_spare(&mut self) -> PartialHit {
        self.spare.pop().unwrap_or_default()
    }
}
