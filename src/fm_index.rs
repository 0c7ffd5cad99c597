// FM-index over the reversed, 2-bit-packed reference text.
//
// The index stores the reverse of the concatenated reference, so appending a
// query base is one backward-extension step and matches grow left-to-right in
// read coordinates. Occurrence counts come from 64-row checkpoint blocks
// holding per-base running counts plus one-hot BWT bitmasks resolved with
// popcount. Suffix-array values are sampled every eighth row and recovered by
// LF-walking; the sentinel row is excluded from all occurrence counts.

use crate::read::encode_base;
use crate::utils::{BinaryRead, BinaryWrite};
use bio::data_structures::suffix_array::suffix_array;
use std::io::{self, Read, Write};

const CP_SHIFT: u64 = 6;
const CP_MASK: u64 = 63;
const SA_INTERVAL: u64 = 8;

const BASE_CHARS: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Half-open suffix-array range; `bot - top` is the occurrence count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaRange {
    pub top: u64,
    pub bot: u64,
}

impl SaRange {
    #[inline]
    pub fn size(&self) -> u64 {
        self.bot.saturating_sub(self.top)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bot <= self.top
    }
}

/// Occurrence checkpoint covering one 64-row block of the BWT: running
/// counts up to the block start plus a one-hot bitmask per base.
#[derive(Debug, Clone, Copy, Default)]
struct CpOcc {
    counts: [u64; 4],
    one_hot: [u64; 4],
}

#[derive(Debug)]
pub struct FmIndex {
    /// Length of the indexed text, sentinel excluded.
    text_len: u64,
    /// 2-bit packed BWT over `text_len + 1` rows; the sentinel row packs as 0.
    bwt: Vec<u8>,
    /// BWT row whose character is the sentinel.
    sentinel_row: u64,
    /// `cum[c]` = 1 (sentinel) + number of text bases lexicographically
    /// below `c`; `cum[4]` is the total row count.
    cum: [u64; 5],
    cp_occ: Vec<CpOcc>,
    /// Suffix-array values at every `SA_INTERVAL`-th row.
    sa_samples: Vec<u64>,
}

impl FmIndex {
    /// Build from the 2-bit codes of the forward concatenated reference.
    /// Codes must be < 4; ambiguous bases are resolved before indexing.
    pub fn build(text: &[u8]) -> FmIndex {
        let n = text.len() as u64;
        let rows = n + 1;

        let mut rev: Vec<u8> = Vec::with_capacity(text.len() + 1);
        rev.extend(text.iter().rev().map(|&c| BASE_CHARS[c as usize]));
        rev.push(b'$');
        let sa = suffix_array(&rev);

        let mut bwt = vec![0u8; ((rows + 3) / 4) as usize];
        let mut sentinel_row = 0u64;
        let mut sa_samples = Vec::with_capacity((rows / SA_INTERVAL + 1) as usize);
        for (row, &suf) in sa.iter().enumerate() {
            let row = row as u64;
            if row % SA_INTERVAL == 0 {
                sa_samples.push(suf as u64);
            }
            let code = if suf == 0 {
                sentinel_row = row;
                0
            } else {
                encode_base(rev[suf - 1])
            };
            bwt[(row / 4) as usize] |= code << ((row % 4) * 2);
        }

        let mut counts = [0u64; 4];
        for &c in text {
            counts[c as usize] += 1;
        }
        let mut cum = [0u64; 5];
        cum[0] = 1;
        for c in 0..4 {
            cum[c + 1] = cum[c] + counts[c];
        }

        let cp_occ = build_checkpoints(&bwt, rows, sentinel_row);
        FmIndex {
            text_len: n,
            bwt,
            sentinel_row,
            cum,
            cp_occ,
            sa_samples,
        }
    }

    #[inline]
    pub fn text_len(&self) -> u64 {
        self.text_len
    }

    /// SA range of the empty query: every row.
    #[inline]
    pub fn full_range(&self) -> SaRange {
        SaRange {
            top: 0,
            bot: self.text_len + 1,
        }
    }

    /// Narrow `range` by one query base. Ambiguous codes never match.
    pub fn extend_right(&self, range: SaRange, base: u8) -> SaRange {
        if base > 3 || range.is_empty() {
            return SaRange::default();
        }
        let c = base as usize;
        SaRange {
            top: self.cum[c] + self.occ(base, range.top),
            bot: self.cum[c] + self.occ(base, range.bot),
        }
    }

    /// Suffix-array value for `row` (offset into the reversed text),
    /// recovered by LF-walking to the nearest sampled row.
    pub fn sa_value(&self, mut row: u64) -> u64 {
        let mut steps = 0u64;
        while row % SA_INTERVAL != 0 {
            if row == self.sentinel_row {
                // suffix at the start of the reversed text
                return steps;
            }
            row = self.lf(row);
            steps += 1;
        }
        self.sa_samples[(row / SA_INTERVAL) as usize] + steps
    }

    /// Occurrences of `base` in BWT rows `[0, row)`, sentinel excluded.
    #[inline]
    fn occ(&self, base: u8, row: u64) -> u64 {
        let cp = &self.cp_occ[(row >> CP_SHIFT) as usize];
        let y = row & CP_MASK;
        let mask = if y == 0 { 0 } else { u64::MAX << (64 - y) };
        cp.counts[base as usize] + (cp.one_hot[base as usize] & mask).count_ones() as u64
    }

    #[inline]
    fn bwt_base(&self, row: u64) -> u8 {
        (self.bwt[(row / 4) as usize] >> ((row % 4) * 2)) & 0x03
    }

    #[inline]
    fn lf(&self, row: u64) -> u64 {
        debug_assert_ne!(row, self.sentinel_row);
        let c = self.bwt_base(row);
        self.cum[c as usize] + self.occ(c, row)
    }

    pub fn save<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64_le(self.text_len)?;
        w.write_u64_le(self.sentinel_row)?;
        w.write_u64_array_le(&self.cum)?;
        w.write_u64_le(self.bwt.len() as u64)?;
        w.write_all(&self.bwt)?;
        w.write_u64_le(self.sa_samples.len() as u64)?;
        w.write_u64_array_le(&self.sa_samples)?;
        Ok(())
    }

    /// Checkpoints are rebuilt from the packed BWT rather than stored.
    pub fn load<R: Read>(r: &mut R) -> io::Result<FmIndex> {
        let text_len = r.read_u64_le()?;
        let sentinel_row = r.read_u64_le()?;
        let mut cum = [0u64; 5];
        cum.copy_from_slice(&r.read_u64_vec_le(5)?);
        let bwt_len = r.read_u64_le()? as usize;
        let mut bwt = vec![0u8; bwt_len];
        r.read_exact(&mut bwt)?;
        let n_samples = r.read_u64_le()? as usize;
        let sa_samples = r.read_u64_vec_le(n_samples)?;

        let cp_occ = build_checkpoints(&bwt, text_len + 1, sentinel_row);
        Ok(FmIndex {
            text_len,
            bwt,
            sentinel_row,
            cum,
            cp_occ,
            sa_samples,
        })
    }
}

fn build_checkpoints(bwt: &[u8], rows: u64, sentinel_row: u64) -> Vec<CpOcc> {
    let n_blocks = (rows >> CP_SHIFT) + 1;
    let mut cp_occ = Vec::with_capacity(n_blocks as usize);
    let mut running = [0u64; 4];
    for blk in 0..n_blocks {
        let mut cp = CpOcc {
            counts: running,
            one_hot: [0u64; 4],
        };
        let start = blk << CP_SHIFT;
        let end = (start + 64).min(rows);
        for row in start..end {
            if row == sentinel_row {
                continue;
            }
            let code = (bwt[(row / 4) as usize] >> ((row % 4) * 2)) & 0x03;
            cp.one_hot[code as usize] |= 1u64 << (63 - (row & CP_MASK));
            running[code as usize] += 1;
        }
        cp_occ.push(cp);
    }
    cp_occ
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &[u8]) -> Vec<u8> {
        s.iter().map(|&b| encode_base(b)).collect()
    }

    fn naive_starts(text: &[u8], pat: &[u8]) -> Vec<u64> {
        if pat.is_empty() || pat.len() > text.len() {
            return Vec::new();
        }
        text.windows(pat.len())
            .enumerate()
            .filter(|(_, w)| *w == pat)
            .map(|(i, _)| i as u64)
            .collect()
    }

    fn range_of(fm: &FmIndex, pat: &[u8]) -> SaRange {
        let mut range = fm.full_range();
        for &c in pat {
            range = fm.extend_right(range, c);
        }
        range
    }

    const TEXT: &[u8] = b"GATTACAGATTACATTAGGATTACACCGGATCGATTAC";

    #[test]
    fn range_sizes_match_naive_counts() {
        let text = encode(TEXT);
        let fm = FmIndex::build(&text);
        for pat in ["GATTACA", "ATTA", "A", "TTAG", "CC", "GATTAC", "T"] {
            let p = encode(pat.as_bytes());
            let range = range_of(&fm, &p);
            assert_eq!(
                range.size() as usize,
                naive_starts(&text, &p).len(),
                "pattern {pat}"
            );
        }
    }

    #[test]
    fn absent_pattern_yields_empty_range_and_stays_empty() {
        let text = encode(TEXT);
        let fm = FmIndex::build(&text);
        let range = range_of(&fm, &encode(b"GGGG"));
        assert!(range.is_empty());
        assert!(fm.extend_right(range, 0).is_empty());
    }

    #[test]
    fn ambiguous_base_never_matches() {
        let text = encode(TEXT);
        let fm = FmIndex::build(&text);
        assert!(fm.extend_right(fm.full_range(), 4).is_empty());
    }

    #[test]
    fn sa_values_locate_every_occurrence() {
        let text = encode(TEXT);
        let fm = FmIndex::build(&text);
        for pat in ["GATTACA", "ATTA", "TTAG", "A"] {
            let p = encode(pat.as_bytes());
            let range = range_of(&fm, &p);
            let mut starts: Vec<u64> = (range.top..range.bot)
                .map(|row| fm.text_len() - fm.sa_value(row) - p.len() as u64)
                .collect();
            starts.sort_unstable();
            assert_eq!(starts, naive_starts(&text, &p), "pattern {pat}");
        }
    }

    #[test]
    fn save_load_round_trip() {
        let text = encode(TEXT);
        let fm = FmIndex::build(&text);
        let mut buf = Vec::new();
        fm.save(&mut buf).unwrap();
        let loaded = FmIndex::load(&mut &buf[..]).unwrap();

        assert_eq!(loaded.text_len(), fm.text_len());
        let p = encode(b"GATTACA");
        let r1 = range_of(&fm, &p);
        let r2 = range_of(&loaded, &p);
        assert_eq!(r1, r2);
        for row in r2.top..r2.bot {
            assert_eq!(fm.sa_value(row), loaded.sa_value(row));
        }
    }
}
