//! Packed bit-vector storage for vertex/facet incidence.
//!
//! Each row is a `Vec<u64>` of words. Rows grow independently and
//! geometrically so that repeated `set` calls during incremental
//! polytope construction stay amortised O(1) instead of re-allocating
//! on every new column.

use thiserror::Error;

const WORD_BITS: usize = 64;

#[derive(Debug, Error)]
pub enum BitMatrixError {
    #[error("allocation failed while growing bit row to {requested_words} words")]
    OutOfMemory { requested_words: usize },
}

/// A single packed row, independently sized.
#[derive(Debug, Clone, Default)]
pub struct BitRow {
    words: Vec<u64>,
}

impl BitRow {
    pub fn new() -> Self {
        BitRow { words: Vec::new() }
    }

    pub fn with_capacity_bits(bits: usize) -> Self {
        BitRow {
            words: Vec::with_capacity(words_for_bits(bits)),
        }
    }

    fn ensure_words(&mut self, need: usize) -> Result<(), BitMatrixError> {
        if self.words.len() >= need {
            return Ok(());
        }
        let new_cap = need.max(self.words.len() * 2).max(4);
        if self.words.try_reserve(new_cap - self.words.len()).is_err() {
            return Err(BitMatrixError::OutOfMemory {
                requested_words: new_cap,
            });
        }
        self.words.resize(need, 0);
        Ok(())
    }

    pub fn set(&mut self, bit: usize) -> Result<(), BitMatrixError> {
        let word = bit / WORD_BITS;
        self.ensure_words(word + 1)?;
        self.words[word] |= 1u64 << (bit % WORD_BITS);
        Ok(())
    }

    pub fn clear(&mut self, bit: usize) {
        let word = bit / WORD_BITS;
        if word < self.words.len() {
            self.words[word] &= !(1u64 << (bit % WORD_BITS));
        }
    }

    pub fn test(&self, bit: usize) -> bool {
        let word = bit / WORD_BITS;
        match self.words.get(word) {
            Some(w) => (w >> (bit % WORD_BITS)) & 1 == 1,
            None => false,
        }
    }

    pub fn popcount(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterate the indices of set bits in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            (0..WORD_BITS).filter_map(move |b| {
                if (w >> b) & 1 == 1 {
                    Some(wi * WORD_BITS + b)
                } else {
                    None
                }
            })
        })
    }

    pub fn and(&self, other: &BitRow) -> BitRow {
        let len = self.words.len().min(other.words.len());
        let words = (0..len).map(|i| self.words[i] & other.words[i]).collect();
        BitRow { words }
    }

    pub fn or(&self, other: &BitRow) -> BitRow {
        let len = self.words.len().max(other.words.len());
        let words = (0..len)
            .map(|i| {
                let a = self.words.get(i).copied().unwrap_or(0);
                let b = other.words.get(i).copied().unwrap_or(0);
                a | b
            })
            .collect();
        BitRow { words }
    }

    /// Rewrites `self` to keep only the columns at the given indices,
    /// in order, packing them into a fresh row starting at bit 0.
    pub fn compress_columns(&self, keep: &[usize]) -> Result<BitRow, BitMatrixError> {
        let mut out = BitRow::with_capacity_bits(keep.len());
        for (new_bit, &old_bit) in keep.iter().enumerate() {
            if self.test(old_bit) {
                out.set(new_bit)?;
            }
        }
        Ok(out)
    }

    /// True if every bit set in `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &BitRow) -> bool {
        for (i, &w) in self.words.iter().enumerate() {
            let ow = other.words.get(i).copied().unwrap_or(0);
            if w & !ow != 0 {
                return false;
            }
        }
        true
    }
}

fn words_for_bits(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

/// Growable matrix of independently-sized `BitRow`s, indexed by row.
///
/// Rows are addressed by `usize` indices; the matrix never shrinks a
/// row vector, since polytope facet/vertex ids are never reused within
/// a run (tombstoning is handled by the owning store, not here).
#[derive(Debug, Clone, Default)]
pub struct BitMatrix {
    rows: Vec<BitRow>,
}

impl BitMatrix {
    pub fn new() -> Self {
        BitMatrix { rows: Vec::new() }
    }

    pub fn push_row(&mut self) -> usize {
        self.rows.push(BitRow::new());
        self.rows.len() - 1
    }

    pub fn row(&self, i: usize) -> &BitRow {
        &self.rows[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut BitRow {
        &mut self.rows[i]
    }

    pub fn set(&mut self, row: usize, col: usize) -> Result<(), BitMatrixError> {
        self.rows[row].set(col)
    }

    pub fn clear(&mut self, row: usize, col: usize) {
        self.rows[row].clear(col);
    }

    pub fn test(&self, row: usize, col: usize) -> bool {
        self.rows[row].test(col)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewrites this matrix to keep only `keep_rows` (in order, packed
    /// from row 0) and, independently, only `keep_cols` within each
    /// surviving row (also packed from column 0).
    pub fn compress(&self, keep_rows: &[usize], keep_cols: &[usize]) -> Result<BitMatrix, BitMatrixError> {
        let mut out = BitMatrix::new();
        for &old_row in keep_rows {
            let compressed = self.rows[old_row].compress_columns(keep_cols)?;
            out.rows.push(compressed);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn set_test_clear_roundtrip() {
        let mut row = BitRow::new();
        row.set(3).unwrap();
        row.set(130).unwrap();
        assert!(row.test(3));
        assert!(row.test(130));
        assert!(!row.test(4));
        row.clear(3);
        assert!(!row.test(3));
        assert!(row.test(130));
    }

    #[test]
    fn popcount_counts_all_set_bits_across_words() {
        let mut row = BitRow::new();
        for bit in [0, 1, 63, 64, 65, 200] {
            row.set(bit).unwrap();
        }
        assert_eq!(row.popcount(), 6);
    }

    #[test]
    fn iter_set_is_sorted_ascending() {
        let mut row = BitRow::new();
        for bit in [200, 3, 64, 0] {
            row.set(bit).unwrap();
        }
        let collected: Vec<_> = row.iter_set().collect();
        assert_eq!(collected, vec![0, 3, 64, 200]);
    }

    #[test]
    fn and_intersects_two_rows() {
        let mut a = BitRow::new();
        let mut b = BitRow::new();
        for bit in [1, 2, 3, 100] {
            a.set(bit).unwrap();
        }
        for bit in [2, 3, 4, 100] {
            b.set(bit).unwrap();
        }
        let c = a.and(&b);
        assert_eq!(c.iter_set().collect::<Vec<_>>(), vec![2, 3, 100]);
    }

    #[test]
    fn or_unions_two_rows_of_different_length() {
        let mut a = BitRow::new();
        let mut b = BitRow::new();
        a.set(1).unwrap();
        a.set(3).unwrap();
        b.set(3).unwrap();
        b.set(200).unwrap();
        let c = a.or(&b);
        assert_eq!(c.iter_set().collect::<Vec<_>>(), vec![1, 3, 200]);
    }

    #[test]
    fn compress_columns_packs_kept_bits_from_zero() {
        let mut row = BitRow::new();
        for bit in [1, 3, 5, 7] {
            row.set(bit).unwrap();
        }
        let compressed = row.compress_columns(&[1, 2, 3, 7]).unwrap();
        // kept columns, in order: 1(set) 2(unset) 3(set) 7(set) -> new bits 0,2,3
        assert_eq!(compressed.iter_set().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn is_subset_of_respects_row_length_mismatch() {
        let mut short = BitRow::new();
        short.set(1).unwrap();
        let mut long = BitRow::new();
        long.set(1).unwrap();
        long.set(200).unwrap();
        assert!(short.is_subset_of(&long));
        assert!(!long.is_subset_of(&short));
    }

    #[test]
    fn bit_matrix_rows_grow_independently() {
        let mut m = BitMatrix::new();
        let r0 = m.push_row();
        let r1 = m.push_row();
        m.set(r0, 5).unwrap();
        m.set(r1, 500).unwrap();
        assert!(m.test(r0, 5));
        assert!(!m.test(r0, 500));
        assert!(m.test(r1, 500));
    }

    #[test]
    fn bit_matrix_compress_drops_rows_and_columns() {
        let mut m = BitMatrix::new();
        let r0 = m.push_row();
        let r1 = m.push_row();
        let r2 = m.push_row();
        m.set(r0, 0).unwrap();
        m.set(r0, 2).unwrap();
        m.set(r1, 2).unwrap();
        m.set(r2, 0).unwrap();
        // drop row r1, drop column 0
        let compressed = m.compress(&[r0, r2], &[1, 2]).unwrap();
        assert_eq!(compressed.len(), 2);
        assert!(compressed.test(0, 1)); // r0's old column 2 -> new column 1
        assert!(!compressed.test(1, 0)); // r2 only had old column 0, which was dropped
    }

    fn row_from_bits(bits: &[usize]) -> BitRow {
        let mut row = BitRow::new();
        for &b in bits {
            row.set(b).unwrap();
        }
        row
    }

    proptest! {
        #[test]
        fn popcount_matches_set_count(bits in proptest::collection::hash_set(0usize..500, 0..50)) {
            let bits: Vec<usize> = bits.into_iter().collect();
            let row = row_from_bits(&bits);
            prop_assert_eq!(row.popcount(), bits.len());
        }

        #[test]
        fn and_is_commutative_and_bounded_by_either_operand(
            a_bits in proptest::collection::hash_set(0usize..300, 0..40),
            b_bits in proptest::collection::hash_set(0usize..300, 0..40),
        ) {
            let a = row_from_bits(&a_bits.into_iter().collect::<Vec<_>>());
            let b = row_from_bits(&b_bits.into_iter().collect::<Vec<_>>());
            prop_assert_eq!(a.and(&b).popcount(), b.and(&a).popcount());
            prop_assert!(a.and(&b).is_subset_of(&a));
            prop_assert!(a.and(&b).is_subset_of(&b));
        }

        #[test]
        fn or_contains_every_bit_of_both_operands(
            a_bits in proptest::collection::hash_set(0usize..300, 0..40),
            b_bits in proptest::collection::hash_set(0usize..300, 0..40),
        ) {
            let a = row_from_bits(&a_bits.iter().copied().collect::<Vec<_>>());
            let b = row_from_bits(&b_bits.iter().copied().collect::<Vec<_>>());
            let u = a.or(&b);
            prop_assert!(a.is_subset_of(&u));
            prop_assert!(b.is_subset_of(&u));
            for bit in a_bits.union(&b_bits) {
                prop_assert!(u.test(*bit));
            }
        }

        #[test]
        fn compress_columns_preserves_order_and_membership(
            bits in proptest::collection::hash_set(0usize..100, 0..20),
            drop_every_third in any::<bool>(),
        ) {
            let row = row_from_bits(&bits.iter().copied().collect::<Vec<_>>());
            let keep: Vec<usize> = (0..100)
                .filter(|i| !drop_every_third || i % 3 != 0)
                .collect();
            let compressed = row.compress_columns(&keep).unwrap();
            let expected: Vec<usize> = keep
                .iter()
                .enumerate()
                .filter(|(_, &old)| bits.contains(&old))
                .map(|(new, _)| new)
                .collect();
            prop_assert_eq!(compressed.iter_set().collect::<Vec<_>>(), expected);
        }
    }
}
