//! Job and step allocation contexts

use gres_core::{AllocationBitmap, GresError, GresResult};

/// Generic resource allocation of a job, one bitmap slot per node
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    /// Number of nodes recorded for the job
    pub node_cnt: usize,
    /// Per-node allocation bitmaps; a slot may be unpopulated
    pub gres_bit_alloc: Vec<Option<AllocationBitmap>>,
}

impl JobContext {
    /// Create a job context with one bitmap per node
    pub fn new(gres_bit_alloc: Vec<Option<AllocationBitmap>>) -> Self {
        Self {
            node_cnt: gres_bit_alloc.len(),
            gres_bit_alloc,
        }
    }
}

/// Generic resource allocation of a job step
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    /// Number of nodes the step spans
    pub node_cnt: usize,
    /// Per-node allocation bitmaps as seen by the step launcher
    pub gres_bit_alloc: Vec<Option<AllocationBitmap>>,
}

impl StepContext {
    /// Create a context for a step running on a single node
    pub fn single_node(bitmap: AllocationBitmap) -> Self {
        Self {
            node_cnt: 1,
            gres_bit_alloc: vec![Some(bitmap)],
        }
    }
}

/// Allocation data handed to the environment hooks
#[derive(Debug, Clone, Copy)]
pub enum GresContext<'a> {
    Job(&'a JobContext),
    Step(&'a StepContext),
}

impl<'a> GresContext<'a> {
    /// Resolve the allocation bitmap for `node_index`.
    ///
    /// Jobs use the slot at `node_index`. Steps only resolve when they span
    /// exactly one node, and then always use slot 0.
    pub fn allocation(&self, node_index: usize) -> GresResult<&'a AllocationBitmap> {
        match *self {
            GresContext::Job(job) => {
                if node_index >= job.node_cnt {
                    return Err(GresError::NoAllocationData(format!(
                        "node index {} outside job with {} nodes",
                        node_index, job.node_cnt
                    )));
                }
                job.gres_bit_alloc
                    .get(node_index)
                    .and_then(Option::as_ref)
                    .ok_or_else(|| {
                        GresError::NoAllocationData(format!(
                            "no job allocation for node index {}",
                            node_index
                        ))
                    })
            }
            GresContext::Step(step) => {
                if step.node_cnt != 1 {
                    return Err(GresError::NoAllocationData(format!(
                        "step spans {} nodes",
                        step.node_cnt
                    )));
                }
                step.gres_bit_alloc
                    .first()
                    .and_then(Option::as_ref)
                    .ok_or_else(|| {
                        GresError::NoAllocationData("no step allocation".to_string())
                    })
            }
        }
    }

    /// Whether this is a job context
    pub fn is_job(&self) -> bool {
        matches!(self, GresContext::Job(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(len: usize, set: &[usize]) -> AllocationBitmap {
        AllocationBitmap::from_indices(len, set.iter().copied()).unwrap()
    }

    #[test]
    fn test_job_resolves_node_slot() {
        let job = JobContext::new(vec![Some(bitmap(2, &[0])), Some(bitmap(2, &[1]))]);
        let ctx = GresContext::Job(&job);
        assert!(ctx.is_job());
        assert!(ctx.allocation(1).unwrap().test(1));
    }

    #[test]
    fn test_job_node_index_out_of_range() {
        let job = JobContext::new(vec![Some(bitmap(2, &[0]))]);
        let err = GresContext::Job(&job).allocation(1).unwrap_err();
        assert!(matches!(err, GresError::NoAllocationData(_)));
    }

    #[test]
    fn test_job_node_count_limits_slots() {
        let job = JobContext {
            node_cnt: 1,
            gres_bit_alloc: vec![Some(bitmap(2, &[0])), Some(bitmap(2, &[1]))],
        };
        assert!(GresContext::Job(&job).allocation(1).is_err());
    }

    #[test]
    fn test_job_unpopulated_slot() {
        let job = JobContext::new(vec![None, Some(bitmap(2, &[1]))]);
        assert!(GresContext::Job(&job).allocation(0).is_err());
    }

    #[test]
    fn test_step_single_node_only() {
        let step = StepContext::single_node(bitmap(3, &[2]));
        assert!(GresContext::Step(&step).allocation(5).unwrap().test(2));

        let multi = StepContext {
            node_cnt: 2,
            gres_bit_alloc: vec![Some(bitmap(3, &[2])), Some(bitmap(3, &[0]))],
        };
        assert!(GresContext::Step(&multi).allocation(0).is_err());

        let empty = StepContext {
            node_cnt: 1,
            gres_bit_alloc: vec![None],
        };
        assert!(GresContext::Step(&empty).allocation(0).is_err());
    }
}
