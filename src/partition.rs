//! Splitting an index range into near-equal contiguous blocks.

/// A division of the half-open range `[first, end)` into contiguous blocks
/// of near-equal size.
///
/// Block sizes differ by at most one: the first `total % num_blocks` blocks
/// receive one extra element. The number of blocks is capped at the range
/// length, so no block is ever empty; an empty range produces zero blocks.
/// Pure and deterministic, so identical inputs always partition identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocks {
    first_index: usize,
    index_after_last: usize,
    block_size: usize,
    num_blocks: usize,
    remainder: usize,
}

impl Blocks {
    /// Divide `[first_index, index_after_last)` into at most
    /// `desired_blocks` blocks. A desired count of zero is treated as one.
    pub fn new(first_index: usize, index_after_last: usize, desired_blocks: usize) -> Self {
        if index_after_last <= first_index {
            return Self {
                first_index,
                index_after_last,
                block_size: 0,
                num_blocks: 0,
                remainder: 0,
            };
        }

        let total_size = index_after_last - first_index;
        let num_blocks = desired_blocks.clamp(1, total_size);

        Self {
            first_index,
            index_after_last,
            block_size: total_size / num_blocks,
            num_blocks,
            remainder: total_size % num_blocks,
        }
    }

    /// The actual number of blocks, which may be less than desired.
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// The first index of the given block.
    pub fn start(&self, block: usize) -> usize {
        self.first_index + block * self.block_size + block.min(self.remainder)
    }

    /// The index after the last index of the given block.
    pub fn end(&self, block: usize) -> usize {
        if block == self.num_blocks - 1 {
            self.index_after_last
        } else {
            self.start(block + 1)
        }
    }

    /// Iterate over the `(start, end)` pairs of all blocks, in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.num_blocks).map(move |blk| (self.start(blk), self.end(blk)))
    }
}
