/// A disjoint-set forest over the integers `0..n`.
///
/// The storage is borrowed from the caller (one `usize` parent and one `u8`
/// rank per element), which keeps this usable without an allocator. The
/// forest knows nothing about grids or boundaries: callers decide which
/// elements are adjacent and simply call [`DisjointSets::union`].
///
/// `find` uses path halving and `union` uses union-by-rank, so a sequence of
/// operations runs in near-linear time. A rank never exceeds `log2(n)`, so
/// `u8` is plenty.
pub struct DisjointSets<'a> {
    parent: &'a mut [usize],
    rank: &'a mut [u8],
}

impl<'a> DisjointSets<'a> {
    /// Initialize a forest where every element is its own singleton set
    pub fn new(parent: &'a mut [usize], rank: &'a mut [u8]) -> Result<Self, &'static str> {
        if parent.len() != rank.len() {
            return Err("parent and rank buffers must have the same length");
        }
        for (i, p) in parent.iter_mut().enumerate() {
            *p = i;
        }
        rank.fill(0);
        Ok(Self { parent, rank })
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find the representative of the set holding `i`
    pub fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            let grandparent = self.parent[self.parent[i]];
            self.parent[i] = grandparent;
            i = grandparent;
        }
        i
    }

    /// Merge the sets holding `a` and `b`. Returns the new representative.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return root_a;
        }
        let (hi, lo) = if self.rank[root_a] >= self.rank[root_b] {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[lo] = hi;
        if self.rank[hi] == self.rank[lo] {
            self.rank[hi] += 1;
        }
        hi
    }
}
