use std::path::{Path, PathBuf};

/// One contiguous slice of the resource, `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub path: PathBuf,
}

impl ChunkSpec {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Ordered, gap-free chunk layout covering `[0, total - 1]` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub total: u64,
    pub chunks: Vec<ChunkSpec>,
}

impl DownloadPlan {
    /// Splits `total` bytes (> 0) into `workers` chunks stored under `dir`.
    ///
    /// Every chunk but the last spans `total / workers` bytes and the last one
    /// absorbs the remainder. When there are more workers than bytes the plan
    /// collapses to a single chunk.
    pub fn new(total: u64, workers: u64, dir: &Path) -> Self {
        assert!(total > 0, "cannot plan an empty resource");

        let workers = workers.max(1);
        let base = total / workers;
        let count = if base == 0 { 1 } else { workers };
        let base = if base == 0 { total } else { base };

        let chunks = (0..count)
            .map(|i| {
                let start = i * base;
                let end = if i == count - 1 { total - 1 } else { start + base - 1 };
                let index = i as usize;
                ChunkSpec {
                    index,
                    start,
                    end,
                    path: dir.join(index.to_string()),
                }
            })
            .collect();

        Self { total, chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(plan: &DownloadPlan) -> Vec<(u64, u64)> {
        plan.chunks.iter().map(|c| (c.start, c.end)).collect()
    }

    #[test]
    fn thousand_bytes_four_workers() {
        let plan = DownloadPlan::new(1000, 4, Path::new("/tmp/x"));
        assert_eq!(ranges(&plan), vec![(0, 249), (250, 499), (500, 749), (750, 999)]);
        assert_eq!(plan.chunks[3].path, Path::new("/tmp/x/3"));
    }

    #[test]
    fn last_chunk_absorbs_remainder() {
        let plan = DownloadPlan::new(1003, 4, Path::new("d"));
        assert_eq!(ranges(&plan), vec![(0, 249), (250, 499), (500, 749), (750, 1002)]);
        assert_eq!(plan.chunks[3].len(), 253);
    }

    #[test]
    fn more_workers_than_bytes_is_one_chunk() {
        for (total, workers) in [(1, 2), (5, 10), (9, 10), (3, 1000)] {
            let plan = DownloadPlan::new(total, workers, Path::new("d"));
            assert_eq!(ranges(&plan), vec![(0, total - 1)], "total={total} workers={workers}");
        }
    }

    #[test]
    fn equal_workers_and_bytes_gives_single_byte_chunks() {
        let plan = DownloadPlan::new(10, 10, Path::new("d"));
        assert_eq!(plan.len(), 10);
        assert!(plan.chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        let plan = DownloadPlan::new(42, 0, Path::new("d"));
        assert_eq!(ranges(&plan), vec![(0, 41)]);
    }

    #[test]
    fn chunks_cover_resource_exactly_once() {
        for total in (1..200).chain([1_000, 4_097, 65_537, 1_000_003]) {
            for workers in [1, 2, 3, 4, 7, 10, 16, 33, 199, 250] {
                let plan = DownloadPlan::new(total, workers, Path::new("d"));
                let mut next = 0;
                for (i, chunk) in plan.chunks.iter().enumerate() {
                    assert_eq!(chunk.index, i);
                    assert_eq!(chunk.start, next, "gap or overlap at total={total} workers={workers}");
                    assert!(chunk.end >= chunk.start);
                    next = chunk.end + 1;
                }
                assert_eq!(next, total, "total={total} workers={workers}");
            }
        }
    }
}
