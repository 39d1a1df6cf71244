/// The ownership rule shared by every [PartitionedArray][crate::PartitionedArray] and by
/// range iteration: `len` elements are split into `num_pes` contiguous blocks of
/// `len / num_pes` elements, the last PE additionally absorbs the `len % num_pes` remainder.
///
/// Ownership is derived from the index alone, nothing is stored per element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockDistribution {
    len: usize,
    num_pes: usize,
    elem_per_pe: usize,
}

impl BlockDistribution {
    pub fn new(len: usize, num_pes: usize) -> BlockDistribution {
        assert!(num_pes > 0, "a distribution requires at least one pe");
        BlockDistribution {
            len,
            num_pes,
            elem_per_pe: len / num_pes,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_pes(&self) -> usize {
        self.num_pes
    }

    pub fn num_elems_on_pe(&self, pe: usize) -> usize {
        assert!(pe < self.num_pes, "invalid pe: {:?}", pe);
        if pe == self.num_pes - 1 {
            self.elem_per_pe + self.len % self.num_pes
        } else {
            self.elem_per_pe
        }
    }

    pub fn pe_start_index(&self, pe: usize) -> usize {
        assert!(pe < self.num_pes, "invalid pe: {:?}", pe);
        pe * self.elem_per_pe
    }

    /// The global indices owned by `pe`
    pub fn local_range(&self, pe: usize) -> std::ops::Range<usize> {
        let start = self.pe_start_index(pe);
        start..start + self.num_elems_on_pe(pe)
    }

    pub fn pe_for_dist_index(&self, index: usize) -> Option<usize> {
        if index >= self.len {
            None
        } else if self.elem_per_pe == 0 {
            Some(self.num_pes - 1)
        } else {
            Some(std::cmp::min(index / self.elem_per_pe, self.num_pes - 1))
        }
    }

    /// The owning pe and the offset within its partition
    pub fn pe_and_offset(&self, index: usize) -> Option<(usize, usize)> {
        self.pe_for_dist_index(index)
            .map(|pe| (pe, index - self.pe_start_index(pe)))
    }
}
