use alloc::vec::Vec;

/// Prefix sums over the effective heights of a column.
///
/// The effective height of a slot is its height plus the gap that follows it; the last slot has
/// no trailing gap. With that convention `prefix_sum(i)` is the top offset of slot `i` and
/// `total()` is the column height.
#[derive(Clone, Debug, Default)]
pub(crate) struct Fenwick {
    tree: Vec<u64>, // 1-indexed, tree[0] unused
    total: u64,
}

impl Fenwick {
    /// Builds the tree in `O(n)` from raw slot heights.
    pub(crate) fn from_heights(heights: impl ExactSizeIterator<Item = u32>, gap: u32) -> Self {
        let n = heights.len();
        let mut tree = alloc::vec![0u64; n + 1];
        let mut total = 0u64;
        for (i, height) in heights.enumerate() {
            let node = i + 1;
            let mut value = height as u64;
            if node < n {
                value = value.saturating_add(gap as u64);
            }
            total = total.saturating_add(value);
            tree[node] = tree[node].saturating_add(value);
            let parent = node + lsb(node);
            if parent <= n {
                tree[parent] = tree[parent].saturating_add(tree[node]);
            }
        }
        Self { tree, total }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len().saturating_sub(1)
    }

    pub(crate) fn clear(&mut self) {
        self.tree.clear();
        self.total = 0;
    }

    /// Appends a slot of `height`.
    ///
    /// The previous last slot gains its trailing gap. Runs in `O(log n)`.
    pub(crate) fn push(&mut self, height: u32, gap: u32) {
        let len = self.len();
        if len > 0 && gap > 0 {
            self.add(len - 1, gap as i64);
        }
        if self.tree.is_empty() {
            self.tree.push(0);
        }

        let node = len + 1;
        // tree[node] covers (node - lsb(node), node]; everything but the new value is already
        // summed in the existing prefix.
        let covered_from = node - lsb(node);
        let before = self.prefix_sum(len).saturating_sub(self.prefix_sum(covered_from));
        self.tree.push(before.saturating_add(height as u64));
        self.total = self.total.saturating_add(height as u64);
    }

    /// Adds `delta` to the effective height of `index`.
    pub(crate) fn add(&mut self, index: usize, delta: i64) {
        let n = self.len();
        if index >= n || delta == 0 {
            return;
        }
        self.total = apply_delta(self.total, delta);
        let mut node = index + 1;
        while node <= n {
            debug_assert!(
                delta >= 0 || self.tree[node] >= delta.unsigned_abs(),
                "Fenwick underflow (node={node}, delta={delta})"
            );
            self.tree[node] = apply_delta(self.tree[node], delta);
            node += lsb(node);
        }
    }

    /// Sum of the first `count` effective heights.
    pub(crate) fn prefix_sum(&self, count: usize) -> u64 {
        let mut node = count.min(self.len());
        let mut sum = 0u64;
        while node > 0 {
            sum = sum.saturating_add(self.tree[node]);
            node &= node - 1;
        }
        sum
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    /// Returns the largest `count` such that `prefix_sum(count) <= target`.
    pub(crate) fn lower_bound(&self, mut target: u64) -> usize {
        let n = self.len();
        let mut idx = 0usize;
        let mut bit = highest_power_of_two_leq(n);
        while bit != 0 {
            let next = idx + bit;
            if next <= n && self.tree[next] <= target {
                target -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn highest_power_of_two_leq(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1usize << (usize::BITS - 1 - n.leading_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_prefix(heights: &[u32], gap: u32, count: usize) -> u64 {
        let mut sum = 0u64;
        for i in 0..count.min(heights.len()) {
            sum += heights[i] as u64;
            if i + 1 < heights.len() {
                sum += gap as u64;
            }
        }
        sum
    }

    #[test]
    fn push_matches_bulk_build() {
        let heights = [5u32, 1, 7, 3, 3, 9, 2, 4, 8, 6, 1];
        let mut pushed = Fenwick::default();
        for &h in &heights {
            pushed.push(h, 2);
        }
        let built = Fenwick::from_heights(heights.iter().copied(), 2);
        assert_eq!(pushed.len(), built.len());
        assert_eq!(pushed.total(), built.total());
        for count in 0..=heights.len() {
            assert_eq!(pushed.prefix_sum(count), naive_prefix(&heights, 2, count));
            assert_eq!(built.prefix_sum(count), naive_prefix(&heights, 2, count));
        }
    }

    #[test]
    fn add_shifts_later_prefixes_only() {
        let mut f = Fenwick::from_heights([10u32, 10, 10, 10].into_iter(), 0);
        f.add(1, 5);
        assert_eq!(f.prefix_sum(1), 10);
        assert_eq!(f.prefix_sum(2), 25);
        assert_eq!(f.prefix_sum(4), 45);
        assert_eq!(f.total(), 45);

        f.add(1, -15);
        assert_eq!(f.prefix_sum(2), 10);
        assert_eq!(f.total(), 30);
    }

    #[test]
    fn lower_bound_counts_slots_starting_at_or_before_target() {
        // tops: 0, 4, 8 (heights 3 + gap 1)
        let f = Fenwick::from_heights([3u32, 3, 3].into_iter(), 1);
        assert_eq!(f.lower_bound(0), 0);
        assert_eq!(f.lower_bound(3), 0);
        assert_eq!(f.lower_bound(4), 1);
        assert_eq!(f.lower_bound(8), 2);
        assert_eq!(f.lower_bound(11), 3);
        assert_eq!(Fenwick::default().lower_bound(100), 0);
    }
}
