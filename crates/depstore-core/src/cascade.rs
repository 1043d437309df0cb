use std::collections::HashSet;

use crate::graph::{Graph, GraphError, PkgId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Removed ids in removal order; each id appears once.
    pub removed: Vec<PkgId>,
    /// Outer passes over the top-level worklist.
    pub passes: usize,
}

/// Removes every candidate that only `referrer` still needs, then everything
/// that becomes unreferenced as a consequence. Returns the removed ids.
///
/// Candidates must exist in the graph; an unknown id is reported as
/// [`GraphError::MissingNode`] and leaves the graph partially swept, so the
/// caller must not persist it.
pub fn cascade(
    graph: &mut Graph,
    candidates: &[PkgId],
    referrer: &str,
) -> Result<Vec<PkgId>, GraphError> {
    cascade_with_stats(graph, candidates, referrer).map(|outcome| outcome.removed)
}

pub fn cascade_with_stats(
    graph: &mut Graph,
    candidates: &[PkgId],
    referrer: &str,
) -> Result<CascadeOutcome, GraphError> {
    let mut run = CascadeRun {
        graph,
        removed: Vec::new(),
        removed_ids: HashSet::new(),
    };
    let passes = run.sweep(candidates.to_vec(), referrer)?;
    Ok(CascadeOutcome {
        removed: run.removed,
        passes,
    })
}

struct CascadeRun<'g> {
    graph: &'g mut Graph,
    removed: Vec<PkgId>,
    // Ids already gone in this run. A cyclic store graph can point back at
    // them; they are skipped rather than treated as missing.
    removed_ids: HashSet<PkgId>,
}

impl CascadeRun<'_> {
    fn sweep(&mut self, candidates: Vec<PkgId>, referrer: &str) -> Result<usize, GraphError> {
        let mut seen = HashSet::new();
        let mut worklist = candidates
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect::<Vec<_>>();

        let mut passes = 0;
        loop {
            passes += 1;
            let mut pending = Vec::with_capacity(worklist.len());
            let mut released = 0_usize;
            for id in worklist {
                if self.removed_ids.contains(&id) {
                    continue;
                }
                if !self.graph.is_free(&id, referrer)? {
                    pending.push(id);
                    continue;
                }
                self.release(id)?;
                released += 1;
            }
            worklist = pending;
            if released == 0 || worklist.is_empty() {
                return Ok(passes);
            }
        }
    }

    fn release(&mut self, id: PkgId) -> Result<(), GraphError> {
        let node = self.graph.remove_node(&id)?;
        self.removed.push(id.clone());
        self.removed_ids.insert(id.clone());

        let children = node.dependency_ids();
        for child in &children {
            if self.removed_ids.contains(child) {
                continue;
            }
            self.graph.detach_edge(&id, child)?;
        }
        self.sweep(children, &id)?;
        Ok(())
    }
}
