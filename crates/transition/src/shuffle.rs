//! Swap-or-not shuffling, both the spec's single-index form and the
//! whole-list form the epochs context precomputes with.

use cairn_types::{Root, ValidatorIndex, misc::bytes_to_int64};
use ethereum_hashing::hash;

const SEED_SIZE: usize = 32;
const PIVOT_VIEW_SIZE: usize = SEED_SIZE + 1;
const TOTAL_SIZE: usize = PIVOT_VIEW_SIZE + 4;

/// Return the position ``index`` lands on after ``rounds`` swap-or-not
/// rounds over a list of ``index_count`` positions.
pub fn compute_shuffled_index(
    mut index: usize,
    index_count: usize,
    seed: Root,
    rounds: u8,
) -> Option<usize> {
    if index >= index_count || index_count == 0 {
        return None;
    }
    for round in 0..rounds {
        let seed_with_round = [seed.as_slice(), &[round]].concat();
        let pivot = bytes_to_int64(&hash(&seed_with_round)[..8]) as usize % index_count;

        let flip = (pivot + index_count - index) % index_count;
        let position = index.max(flip);
        let seed_with_position = [
            seed_with_round.as_slice(),
            &((position / 256) as u32).to_le_bytes(),
        ]
        .concat();
        let source = hash(&seed_with_position);
        let byte = source[(position % 256) / 8];
        let bit = (byte >> (position % 8)) & 1;

        if bit == 1 {
            index = flip;
        }
    }
    Some(index)
}

/// Shuffle (or with ``forwards == false`` un-shuffle) an entire index list in
/// place. The un-shuffled list is what committee slicing wants:
/// ``out[i] == input[compute_shuffled_index(i, ..)]``.
///
/// Far faster than applying `compute_shuffled_index` per element; the round
/// hashes are shared across the whole list.
pub fn shuffle_list(
    mut input: Vec<ValidatorIndex>,
    rounds: u8,
    seed: Root,
    forwards: bool,
) -> Option<Vec<ValidatorIndex>> {
    let list_size = input.len();

    if list_size == 0 {
        return Some(input);
    }
    if rounds == 0 || list_size > 2_usize.pow(24) || list_size > usize::MAX / 2 {
        return None;
    }

    let mut buf: Vec<u8> = Vec::with_capacity(TOTAL_SIZE);
    buf.extend_from_slice(seed.as_slice());

    let mut round = if forwards { 0 } else { rounds - 1 };

    loop {
        buf.truncate(SEED_SIZE);
        buf.push(round);

        let pivot = bytes_to_int64(&hash(&buf[0..PIVOT_VIEW_SIZE])[0..8]) as usize % list_size;

        let mirror = (pivot + 1) >> 1;

        buf.truncate(PIVOT_VIEW_SIZE);
        buf.extend_from_slice(&((pivot >> 8) as u32).to_le_bytes());
        let mut source = hash(&buf);
        let mut byte_v = source[(pivot & 0xff) >> 3];

        for i in 0..mirror {
            let j = pivot - i;

            if j & 0xff == 0xff {
                buf.truncate(PIVOT_VIEW_SIZE);
                buf.extend_from_slice(&((j >> 8) as u32).to_le_bytes());
                source = hash(&buf);
            }
            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }
            if (byte_v >> (j & 0x07)) & 0x01 == 1 {
                input.swap(i, j);
            }
        }

        let mirror = (pivot + list_size + 1) >> 1;
        let end = list_size - 1;

        buf.truncate(PIVOT_VIEW_SIZE);
        buf.extend_from_slice(&((end >> 8) as u32).to_le_bytes());
        let mut source = hash(&buf);
        let mut byte_v = source[(end & 0xff) >> 3];

        for (loop_iter, i) in ((pivot + 1)..mirror).enumerate() {
            let j = end - loop_iter;

            if j & 0xff == 0xff {
                buf.truncate(PIVOT_VIEW_SIZE);
                buf.extend_from_slice(&((j >> 8) as u32).to_le_bytes());
                source = hash(&buf);
            }
            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }
            if (byte_v >> (j & 0x07)) & 0x01 == 1 {
                input.swap(i, j);
            }
        }

        if forwards {
            round += 1;
            if round == rounds {
                break;
            }
        } else {
            if round == 0 {
                break;
            }
            round -= 1;
        }
    }

    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unshuffled_list_matches_single_index_form() {
        let seed = Root::repeat_byte(0x42);
        let rounds = 10;
        let input: Vec<u64> = (100..150).collect();

        let unshuffled = shuffle_list(input.clone(), rounds, seed, false).unwrap();
        for (position, &value) in unshuffled.iter().enumerate() {
            let source = compute_shuffled_index(position, input.len(), seed, rounds).unwrap();
            assert_eq!(value, input[source]);
        }
    }

    #[test]
    fn shuffle_then_unshuffle_is_identity() {
        let seed = Root::repeat_byte(0x07);
        let input: Vec<u64> = (0..97).collect();
        let shuffled = shuffle_list(input.clone(), 90, seed, true).unwrap();
        let restored = shuffle_list(shuffled, 90, seed, false).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        assert_eq!(compute_shuffled_index(5, 5, Root::ZERO, 10), None);
        assert_eq!(compute_shuffled_index(0, 0, Root::ZERO, 10), None);
    }

    #[test]
    fn empty_list_shuffles_to_itself() {
        assert_eq!(shuffle_list(vec![], 90, Root::ZERO, true), Some(vec![]));
    }
}
