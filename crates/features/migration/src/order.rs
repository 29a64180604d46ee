use crate::task::MigrationTask;
use fxhash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Orders tasks so that dependencies run first; among ready tasks the higher priority wins,
/// then registration order. Tasks left on a cycle (or waiting on each other) are appended by
/// priority; their dependency check fails at run time.
pub(crate) fn execution_order(tasks: &[Arc<dyn MigrationTask>]) -> Vec<Arc<dyn MigrationTask>> {
    let ids: FxHashSet<&str> = tasks.iter().map(|t| t.spec().id.as_str()).collect();
    let mut pending: FxHashMap<&str, usize> = tasks
        .iter()
        .map(|t| {
            let blocking =
                t.spec().dependencies.iter().filter(|d| ids.contains(d.as_str())).count();
            (t.spec().id.as_str(), blocking)
        })
        .collect();

    let mut remaining: Vec<(usize, &Arc<dyn MigrationTask>)> = tasks.iter().enumerate().collect();
    let mut ordered = Vec::with_capacity(tasks.len());

    loop {
        let ready = remaining
            .iter()
            .enumerate()
            .filter(|(_, (_, t))| pending.get(t.spec().id.as_str()).copied() == Some(0))
            .max_by(|(_, (ia, a)), (_, (ib, b))| {
                a.spec().priority.cmp(&b.spec().priority).then_with(|| ib.cmp(ia))
            })
            .map(|(slot, _)| slot);

        let Some(slot) = ready else {
            break;
        };

        let (_, task) = remaining.remove(slot);
        let id = task.spec().id.as_str();
        for (_, other) in &remaining {
            if other.spec().dependencies.iter().any(|d| d == id)
                && let Some(count) = pending.get_mut(other.spec().id.as_str())
            {
                *count = count.saturating_sub(1);
            }
        }
        ordered.push(Arc::clone(task));
    }

    remaining.sort_by(|(ia, a), (ib, b)| b.spec().priority.cmp(&a.spec().priority).then(ia.cmp(ib)));
    ordered.extend(remaining.into_iter().map(|(_, t)| Arc::clone(t)));
    ordered
}
