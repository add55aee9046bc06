//! Phase one of a distributed repeat: offsets of every partition in the output.
//!
//! Partitions cover contiguous, disjoint ranges of the target axis. Once their base offsets
//! are known, each partition expands its own indices without looking at any other partition.

use alloc::vec::Vec;
use core::ops::Range;

use super::RepeatSpec;

/// Exclusive prefix sum of `counts`, together with the grand total.
///
/// `offsets[i]` is the sum of `counts[..i]`.
pub fn exclusive_scan<I: IntoIterator<Item = usize>>(counts: I) -> (Vec<usize>, usize) {
    let mut total = 0;
    let offsets = counts
        .into_iter()
        .map(|count| {
            let offset = total;
            total += count;
            offset
        })
        .collect();

    (offsets, total)
}

/// Placement of one partition in the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionOffset {
    /// Input indices of the partition along the target axis.
    pub range: Range<usize>,
    /// First output index written by the partition.
    pub base_offset: usize,
    /// Number of output indices written by the partition.
    pub extent: usize,
}

/// Result of scanning the partitions of the target axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionScan {
    /// One entry per partition, in axis order.
    pub partitions: Vec<PartitionOffset>,
    /// Output extent of the whole axis.
    pub total: usize,
}

/// Computes the base offset of every partition.
///
/// The local totals are independent reductions over each partition's slice of the counts;
/// they are combined with a single exclusive scan. A uniform count needs no reduction.
pub fn scan_partitions(spec: &RepeatSpec, ranges: &[Range<usize>]) -> PartitionScan {
    let local_total = |range: &Range<usize>| spec.local(range.clone()).total(range.len());

    #[cfg(feature = "std")]
    let totals: Vec<usize> = {
        use rayon::prelude::*;
        ranges.par_iter().map(local_total).collect()
    };
    #[cfg(not(feature = "std"))]
    let totals: Vec<usize> = ranges.iter().map(local_total).collect();

    let (offsets, total) = exclusive_scan(totals.iter().copied());
    let partitions = ranges
        .iter()
        .zip(offsets)
        .zip(totals)
        .map(|((range, base_offset), extent)| PartitionOffset {
            range: range.clone(),
            base_offset,
            extent,
        })
        .collect();

    log::trace!("Scanned {} partitions, output extent {total}", ranges.len());

    PartitionScan { partitions, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_exclusive_scan() {
        let (offsets, total) = exclusive_scan([1, 2, 3]);
        assert_eq!(offsets, vec![0, 1, 3]);
        assert_eq!(total, 6);
    }

    #[test]
    fn test_exclusive_scan_with_zero_counts() {
        let (offsets, total) = exclusive_scan([0, 4, 0, 1]);
        assert_eq!(offsets, vec![0, 0, 4, 4]);
        assert_eq!(total, 5);
    }

    #[test]
    fn test_exclusive_scan_empty() {
        let (offsets, total) = exclusive_scan(core::iter::empty());
        assert!(offsets.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_scan_partitions_per_index() {
        let spec = RepeatSpec::PerIndex(vec![1, 2, 3, 0, 5]);
        let scan = scan_partitions(&spec, &[0..2, 2..4, 4..5]);

        let offsets: Vec<_> = scan.partitions.iter().map(|p| p.base_offset).collect();
        let extents: Vec<_> = scan.partitions.iter().map(|p| p.extent).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
        assert_eq!(extents, vec![3, 3, 5]);
        assert_eq!(scan.total, 11);
    }

    #[test]
    fn test_scan_partitions_uniform() {
        let scan = scan_partitions(&RepeatSpec::Uniform(3), &[0..3, 3..5]);
        assert_eq!(scan.partitions[1].base_offset, 9);
        assert_eq!(scan.total, 15);
    }
}
