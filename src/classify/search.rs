// Strand-selective partial-match search.
//
// `partial_search` extends one maximal exact match from the strand cursor;
// `search_forward_and_reverse` interleaves both strands of one mate and
// abandons a strand that falls hopelessly behind the other.

use crate::classify::hits::ReadBwtHit;
use crate::fm_index::SaRange;
use crate::index::Index;
use crate::read::ReadSeq;

/// Cursor back-off step applied after a short partial hit.
pub const INCREMENT: usize = 10;

/// Extend the longest exact match starting at the strand cursor and append
/// it as a partial hit. Hits shorter than `min_hit_len` (including empty
/// ones) are recorded anyway; downstream stages ignore them. The cursor
/// advances past the match, or by one base when nothing matched.
pub fn partial_search<I: Index>(index: &I, seq: &[u8], hit: &mut ReadBwtHit, min_hit_len: usize) {
    let read_len = seq.len();
    let off = hit.cursor;
    let mut range = index.init_range();
    let mut len = 0usize;
    let mut i = off;
    while i < read_len {
        let c = seq[i];
        if c > 3 {
            break;
        }
        let next = index.extend_right(range, c);
        if next.is_empty() {
            break;
        }
        range = next;
        len += 1;
        i += 1;
    }

    let mut ph = hit.take_spare();
    ph.bw_off = read_len - off - len;
    ph.len = len;
    ph.range = if len > 0 { range } else { SaRange::default() };
    hit.hits.push(ph);

    hit.cursor = off + len.max(1);
    if hit.cursor + min_hit_len > read_len {
        hit.done = true;
    }
}

/// Interleaved two-strand search over one mate. Each round advances every
/// not-done strand by one partial search, then applies the progress-balance
/// rule: a strand trailing the other by more than
/// `max(read_len / 2, 2 * min_hit_len)` cannot win the strand election and
/// is abandoned.
pub fn search_forward_and_reverse<I: Index>(
    index: &I,
    read: &ReadSeq,
    hits: &mut [ReadBwtHit; 2],
    min_hit_len: usize,
) {
    let read_len = read.len();
    hits[0].reset(true, read_len);
    hits[1].reset(false, read_len);
    if read_len < min_hit_len {
        hits[0].done = true;
        hits[1].done = true;
        return;
    }

    let max_diff = (read_len / 2).max(2 * min_hit_len);
    let mut done = [false; 2];
    let mut cur = [0usize; 2];
    while !done[0] || !done[1] {
        for fwi in 0..2 {
            if done[fwi] {
                continue;
            }
            let seq = if fwi == 0 { &read.fw } else { &read.rc };
            let hit = &mut hits[fwi];
            partial_search(index, seq, hit, min_hit_len);
            if hit.done {
                done[fwi] = true;
                cur[fwi] = read_len;
                continue;
            }
            cur[fwi] = hit.cursor;

            let last_len = hit.hits.last().map(|h| h.len).unwrap_or(0);
            if last_len > INCREMENT {
                if last_len < min_hit_len {
                    // short match: back off and retry with overlap
                    hit.cursor -= INCREMENT;
                } else {
                    hit.cursor += 1;
                }
            }
            if hit.cursor + min_hit_len >= read_len {
                hit.done = true;
                done[fwi] = true;
            }
        }
        if cur[0] > cur[1] + max_diff {
            hits[1].done = true;
            done[1] = true;
        } else if cur[1] > cur[0] + max_diff {
            hits[0].done = true;
            done[0] = true;
        }
    }
}
