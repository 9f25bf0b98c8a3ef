/// A bitmap over the rows `0..len` of a dataset, counting bits in order from
/// least-to-most significant bits and ascending words. Bits at or beyond
/// `len` in the last word are always clear.
#[derive(Clone, Default, PartialEq, Eq, Debug, Hash)]
pub struct RowSet {
    words: Vec<u64>,
    len: usize,
}

impl RowSet {
    pub fn new(len: usize) -> Self {
        RowSet {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }
    pub fn full(len: usize) -> Self {
        let mut rs = RowSet {
            words: vec![u64::MAX; len.div_ceil(64)],
            len,
        };
        rs.clear_tail();
        rs
    }
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut rs = RowSet::new(len);
        for i in indices {
            if i < len {
                rs.set(i, true);
            }
        }
        rs
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn set(&mut self, i: usize, val: bool) {
        debug_assert!(i < self.len);
        if val {
            self.words[i / 64] |= 1 << (i % 64);
        } else {
            self.words[i / 64] &= !(1 << (i % 64));
        }
    }
    pub fn get(&self, i: usize) -> bool {
        i < self.len && (self.words[i / 64] & (1 << (i % 64))) != 0
    }
    pub fn count(&self) -> usize {
        self.words.iter().map(|x| x.count_ones() as usize).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|x| *x == 0)
    }
    pub fn union(&mut self, other: &Self) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= *b;
        }
    }
    pub fn intersect(&mut self, other: &Self) {
        for (i, a) in self.words.iter_mut().enumerate() {
            *a &= other.words.get(i).copied().unwrap_or(0);
        }
    }
    pub fn subtract(&mut self, other: &Self) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= !*b;
        }
    }
    pub fn complement(&mut self) {
        for w in self.words.iter_mut() {
            *w = !*w;
        }
        self.clear_tail();
    }
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, word)| {
            let mut bits = *word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * 64 + tz)
            })
        })
    }
    pub fn to_indices(&self) -> Vec<usize> {
        self.iter().collect()
    }

    fn clear_tail(&mut self) {
        let rem = self.len % 64;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}
