use fstone_domain::Feature;
use fxhash::{FxHashMap, FxHashSet};

/// Orders `requested` so that every id comes after the requested ids it (transitively) depends on.
///
/// Traversal follows dependencies through features that were not requested, but only requested
/// ids are emitted. Ties keep request order; duplicates are dropped. A back-edge is ignored,
/// so ids on a cycle still appear exactly once.
pub(crate) fn dependency_order(
    features: &FxHashMap<String, Feature>,
    requested: &[String],
) -> Vec<String> {
    let wanted: FxHashSet<&str> = requested.iter().map(String::as_str).collect();
    let mut walk = Walk {
        features,
        wanted: &wanted,
        visited: FxHashSet::default(),
        stack: FxHashSet::default(),
        out: Vec::with_capacity(requested.len()),
    };

    for id in requested {
        walk.visit(id);
    }
    walk.out
}

struct Walk<'a> {
    features: &'a FxHashMap<String, Feature>,
    wanted: &'a FxHashSet<&'a str>,
    visited: FxHashSet<&'a str>,
    stack: FxHashSet<&'a str>,
    out: Vec<String>,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, id: &'a str) {
        if self.visited.contains(id) || !self.stack.insert(id) {
            return;
        }

        let features = self.features;
        if let Some(feature) = features.get(id) {
            for dependency in &feature.dependencies {
                self.visit(dependency);
            }
        }

        self.stack.remove(id);
        self.visited.insert(id);
        if self.wanted.contains(id) {
            self.out.push(id.to_owned());
        }
    }
}
