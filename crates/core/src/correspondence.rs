//! The correspondence relation over resources.
//!
//! `corresponds` is kept closed by a disjoint-set forest: every insertion
//! links the asserted resources into one set, and two resources correspond
//! iff they share a root. `incorresponds` edges are stored between roots and
//! re-pointed whenever a root is absorbed, so an incorrespondence between two
//! resources holds for every member of their two groups. It is never closed
//! over two different incorrespondence edges.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// A single asserted edge, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "relation", rename_all = "snake_case")]
pub enum CorrespondenceEdge {
    Corresponds { left: Resource, right: Resource },
    Incorresponds { left: Resource, right: Resource },
}

/// Persisted relation state used to seed a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceSnapshot {
    #[serde(default)]
    pub corresponds: Vec<(Resource, Resource)>,
    #[serde(default)]
    pub incorresponds: Vec<(Resource, Resource)>,
}

impl CorrespondenceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.corresponds.is_empty() && self.incorresponds.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CorrespondenceStore {
    index: HashMap<Resource, usize>,
    resources: Vec<Resource>,
    parent: Vec<Cell<usize>>,
    /// Members of each set; only meaningful at roots.
    members: Vec<Vec<usize>>,
    /// Root → roots it is incorrespondent with. Symmetric.
    incorrespondent: HashMap<usize, BTreeSet<usize>>,
    /// Edges added since construction (seed edges excluded).
    added: Vec<CorrespondenceEdge>,
}

impl CorrespondenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from prior state. Contradicting seed edges are dropped
    /// the same way live insertions are.
    pub fn from_snapshot(snapshot: &CorrespondenceSnapshot) -> Self {
        let mut store = Self::new();
        for (a, b) in &snapshot.corresponds {
            store.add_correspondence(&[a.clone(), b.clone()]);
        }
        for (a, b) in &snapshot.incorresponds {
            store.add_incorrespondence(a, b);
        }
        store.added.clear();
        store
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `true` iff `a == b` or both are in the same correspondence group.
    pub fn correspond(&self, a: &Resource, b: &Resource) -> bool {
        if a == b {
            return true;
        }
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.find(ia) == self.find(ib),
            _ => false,
        }
    }

    pub fn incorrespondent(&self, a: &Resource, b: &Resource) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => {
                let (ra, rb) = (self.find(ia), self.find(ib));
                self.incorrespondent
                    .get(&ra)
                    .is_some_and(|others| others.contains(&rb))
            }
            _ => false,
        }
    }

    /// Vacuously `true` for fewer than two resources.
    pub fn all_correspond(&self, resources: &[Resource]) -> bool {
        resources
            .iter()
            .enumerate()
            .all(|(i, a)| resources[i + 1..].iter().all(|b| self.correspond(a, b)))
    }

    pub fn any_incorrespondent(&self, resources: &[Resource]) -> bool {
        resources
            .iter()
            .enumerate()
            .any(|(i, a)| resources[i + 1..].iter().any(|b| self.incorrespondent(a, b)))
    }

    pub fn correspondent_or_incorrespondent(&self, a: &Resource, b: &Resource) -> bool {
        self.correspond(a, b) || self.incorrespondent(a, b)
    }

    /// The group containing `resource`, which is just the resource itself if
    /// it has never been linked.
    pub fn correspondence_group(&self, resource: &Resource) -> BTreeSet<Resource> {
        match self.index.get(resource) {
            Some(&i) => self.members[self.find(i)]
                .iter()
                .map(|&m| self.resources[m].clone())
                .collect(),
            None => BTreeSet::from([resource.clone()]),
        }
    }

    /// Stable stand-in for the group of `resource`: its root resource.
    pub fn representative(&self, resource: &Resource) -> Resource {
        match self.index.get(resource) {
            Some(&i) => self.resources[self.find(i)].clone(),
            None => resource.clone(),
        }
    }

    /// Partitions `universe` into correspondence groups, singletons included.
    ///
    /// Groups only contain members of `universe` and are ordered by their
    /// smallest member. Each call is a fresh pass over the current state.
    pub fn correspondence_groups<'a>(
        &self,
        universe: impl IntoIterator<Item = &'a Resource>,
    ) -> std::vec::IntoIter<BTreeSet<Resource>> {
        let mut by_root: BTreeMap<Resource, BTreeSet<Resource>> = BTreeMap::new();
        for resource in universe {
            by_root
                .entry(self.representative(resource))
                .or_default()
                .insert(resource.clone());
        }
        let mut groups: Vec<BTreeSet<Resource>> = by_root.into_values().collect();
        groups.sort();
        groups.into_iter()
    }

    /// Edges inserted since the store was created or seeded.
    pub fn added_edges(&self) -> &[CorrespondenceEdge] {
        &self.added
    }

    /// Full relation state: one star per group plus incorrespondences
    /// between group representatives.
    pub fn snapshot(&self) -> CorrespondenceSnapshot {
        let mut corresponds = Vec::new();
        let mut incorresponds = Vec::new();
        let mut roots: Vec<usize> = (0..self.resources.len())
            .filter(|&i| self.find(i) == i)
            .collect();
        roots.sort_by(|a, b| self.resources[*a].cmp(&self.resources[*b]));
        for &root in &roots {
            let mut members: Vec<&Resource> = self.members[root]
                .iter()
                .filter(|&&m| m != root)
                .map(|&m| &self.resources[m])
                .collect();
            members.sort();
            for member in members {
                corresponds.push((self.resources[root].clone(), member.clone()));
            }
            if let Some(others) = self.incorrespondent.get(&root) {
                let mut others: Vec<&Resource> = others
                    .iter()
                    .filter(|&&o| self.resources[root] < self.resources[o])
                    .map(|&o| &self.resources[o])
                    .collect();
                others.sort();
                for other in others {
                    incorresponds.push((self.resources[root].clone(), other.clone()));
                }
            }
        }
        CorrespondenceSnapshot {
            corresponds,
            incorresponds,
        }
    }

    // -----------------------------------------------------------------------
    // Insertions
    // -----------------------------------------------------------------------

    /// Links all `resources` into one group.
    ///
    /// No-op (returns `false`) for fewer than two distinct resources, when
    /// any pair is incorrespondent, or when all already correspond.
    pub fn add_correspondence(&mut self, resources: &[Resource]) -> bool {
        let mut distinct: Vec<Resource> = Vec::with_capacity(resources.len());
        for r in resources {
            if !distinct.contains(r) {
                distinct.push(r.clone());
            }
        }
        if distinct.len() < 2 || self.all_correspond(&distinct) {
            return false;
        }
        if self.any_incorrespondent(&distinct) {
            log::debug!(
                "discarding correspondence of {} resources: contradicts a known incorrespondence",
                distinct.len()
            );
            return false;
        }

        let first = self.ensure(&distinct[0]);
        for other in &distinct[1..] {
            let i = self.ensure(other);
            if self.find(first) != self.find(i) {
                self.added.push(CorrespondenceEdge::Corresponds {
                    left: distinct[0].clone(),
                    right: other.clone(),
                });
                self.union(first, i);
            }
        }
        true
    }

    /// Marks the groups of `a` and `b` as not corresponding. No-op if the pair
    /// already corresponds or is already incorrespondent.
    pub fn add_incorrespondence(&mut self, a: &Resource, b: &Resource) -> bool {
        if self.correspondent_or_incorrespondent(a, b) {
            if a != b && self.correspond(a, b) {
                log::debug!("discarding incorrespondence of {a} and {b}: they correspond");
            }
            return false;
        }
        let ia = self.ensure(a);
        let ib = self.ensure(b);
        let (ra, rb) = (self.find(ia), self.find(ib));
        self.incorrespondent.entry(ra).or_default().insert(rb);
        self.incorrespondent.entry(rb).or_default().insert(ra);
        self.added.push(CorrespondenceEdge::Incorresponds {
            left: a.clone(),
            right: b.clone(),
        });
        true
    }

    // -----------------------------------------------------------------------
    // Disjoint-set internals
    // -----------------------------------------------------------------------

    fn ensure(&mut self, resource: &Resource) -> usize {
        if let Some(&i) = self.index.get(resource) {
            return i;
        }
        let i = self.resources.len();
        self.index.insert(resource.clone(), i);
        self.resources.push(resource.clone());
        self.parent.push(Cell::new(i));
        self.members.push(vec![i]);
        i
    }

    /// Root of `i`, compressing the path on the way.
    fn find(&self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root].get() != root {
            root = self.parent[root].get();
        }
        let mut node = i;
        while node != root {
            let next = self.parent[node].get();
            self.parent[node].set(root);
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (root, absorbed) = if self.members[ra].len() >= self.members[rb].len() {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[absorbed].set(root);
        let moved = std::mem::take(&mut self.members[absorbed]);
        self.members[root].extend(moved);

        if let Some(others) = self.incorrespondent.remove(&absorbed) {
            for other in others {
                if let Some(back) = self.incorrespondent.get_mut(&other) {
                    back.remove(&absorbed);
                    back.insert(root);
                }
                self.incorrespondent.entry(root).or_default().insert(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(name: &str) -> Resource {
        Resource::from(name)
    }

    fn rs(names: &[&str]) -> Vec<Resource> {
        names.iter().map(|n| r(n)).collect()
    }

    #[test]
    fn reflexive_without_storage() {
        let store = CorrespondenceStore::new();
        assert!(store.correspond(&r("a"), &r("a")));
        assert!(!store.correspond(&r("a"), &r("b")));
        assert!(store.all_correspond(&rs(&["a"])));
        assert!(store.all_correspond(&[]));
        assert!(!store.any_incorrespondent(&rs(&["a"])));
        assert!(store.correspondent_or_incorrespondent(&r("x"), &r("x")));
    }

    #[test]
    fn closure_across_insertions() {
        let mut store = CorrespondenceStore::new();
        assert!(store.add_correspondence(&rs(&["a", "b"])));
        assert!(store.add_correspondence(&rs(&["b", "c"])));
        assert!(store.correspond(&r("a"), &r("c")));
        assert!(store.correspond(&r("c"), &r("a")));
        assert!(store.all_correspond(&rs(&["a", "b", "c"])));
    }

    #[test]
    fn new_link_sees_existing_group() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&rs(&["a", "x"]));
        store.add_correspondence(&rs(&["b", "a"]));
        assert!(store.correspond(&r("b"), &r("x")));
    }

    #[test]
    fn star_insertion_links_whole_set() {
        let mut store = CorrespondenceStore::new();
        assert!(store.add_correspondence(&rs(&["a", "b", "c", "d"])));
        assert!(store.all_correspond(&rs(&["a", "b", "c", "d"])));
        assert_eq!(store.added_edges().len(), 3);
        assert_eq!(
            store.added_edges()[0],
            CorrespondenceEdge::Corresponds {
                left: r("a"),
                right: r("b")
            }
        );
    }

    #[test]
    fn idempotent_insertion() {
        let mut store = CorrespondenceStore::new();
        assert!(store.add_correspondence(&rs(&["a", "b", "c"])));
        let snapshot = store.snapshot();
        assert!(!store.add_correspondence(&rs(&["a", "b", "c"])));
        assert!(!store.add_correspondence(&rs(&["c", "a"])));
        assert_eq!(store.snapshot(), snapshot);
        assert_eq!(store.added_edges().len(), 2);
    }

    #[test]
    fn too_few_resources_is_noop() {
        let mut store = CorrespondenceStore::new();
        assert!(!store.add_correspondence(&rs(&["a"])));
        assert!(!store.add_correspondence(&rs(&["a", "a"])));
        assert!(store.added_edges().is_empty());
    }

    #[test]
    fn incorrespondence_blocks_correspondence() {
        let mut store = CorrespondenceStore::new();
        assert!(store.add_incorrespondence(&r("a"), &r("b")));
        let before = store.snapshot();
        assert!(!store.add_correspondence(&rs(&["a", "b", "c"])));
        assert_eq!(store.snapshot(), before);
        assert!(!store.correspond(&r("a"), &r("c")));
    }

    #[test]
    fn correspondence_blocks_incorrespondence() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&rs(&["a", "b"]));
        assert!(!store.add_incorrespondence(&r("a"), &r("b")));
        assert!(!store.add_incorrespondence(&r("b"), &r("a")));
        assert!(!store.incorrespondent(&r("a"), &r("b")));
        assert!(!store.add_incorrespondence(&r("a"), &r("a")));
    }

    #[test]
    fn incorrespondence_propagates_one_hop() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&rs(&["a", "x"]));
        store.add_incorrespondence(&r("a"), &r("b"));
        assert!(store.any_incorrespondent(&rs(&["x", "b"])));
        assert!(store.incorrespondent(&r("b"), &r("x")));
        assert!(!store.any_incorrespondent(&rs(&["b", "c"])));

        // not closed over two incorrespondence edges
        store.add_incorrespondence(&r("a"), &r("c"));
        assert!(!store.incorrespondent(&r("b"), &r("c")));
        assert!(store.add_correspondence(&rs(&["b", "c"])));
    }

    #[test]
    fn incorrespondence_survives_later_merges() {
        let mut store = CorrespondenceStore::new();
        store.add_incorrespondence(&r("a"), &r("b"));
        // grow a's group so its root may change
        store.add_correspondence(&rs(&["p", "q", "r"]));
        store.add_correspondence(&rs(&["p", "a"]));
        store.add_correspondence(&rs(&["b", "y"]));
        assert!(store.incorrespondent(&r("q"), &r("y")));
        assert!(store.incorrespondent(&r("y"), &r("r")));
        assert!(!store.add_correspondence(&rs(&["r", "y"])));
    }

    #[test]
    fn groups_partition_universe() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&rs(&["b1", "a1"]));
        store.add_correspondence(&rs(&["a2", "c2"]));
        store.add_correspondence(&rs(&["zz", "outside"]));
        let universe = rs(&["a1", "a2", "a3", "b1", "c2", "zz"]);

        let groups: Vec<BTreeSet<Resource>> = store.correspondence_groups(&universe).collect();
        let expected: Vec<BTreeSet<Resource>> = vec![
            rs(&["a1", "b1"]).into_iter().collect(),
            rs(&["a2", "c2"]).into_iter().collect(),
            rs(&["a3"]).into_iter().collect(),
            rs(&["zz"]).into_iter().collect(),
        ];
        assert_eq!(groups, expected);

        let union: BTreeSet<Resource> = groups.iter().flatten().cloned().collect();
        assert_eq!(union, universe.iter().cloned().collect());

        // restartable
        let again: Vec<BTreeSet<Resource>> = store.correspondence_groups(&universe).collect();
        assert_eq!(again, groups);
    }

    #[test]
    fn single_group_lookup() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&rs(&["a", "b", "c"]));
        assert_eq!(store.correspondence_group(&r("b")).len(), 3);
        assert_eq!(
            store.correspondence_group(&r("lonely")),
            BTreeSet::from([r("lonely")])
        );
    }

    #[test]
    fn snapshot_seeds_without_reporting() {
        let mut store = CorrespondenceStore::new();
        store.add_correspondence(&rs(&["a", "b", "c"]));
        store.add_incorrespondence(&r("a"), &r("d"));
        let snapshot = store.snapshot();

        let seeded = CorrespondenceStore::from_snapshot(&snapshot);
        assert!(seeded.added_edges().is_empty());
        assert!(seeded.all_correspond(&rs(&["a", "b", "c"])));
        assert!(seeded.incorrespondent(&r("c"), &r("d")));
        assert_eq!(seeded.snapshot(), snapshot);
    }

    #[test]
    fn contradicting_seed_edges_are_dropped() {
        let snapshot = CorrespondenceSnapshot {
            corresponds: vec![(r("a"), r("b"))],
            incorresponds: vec![(r("b"), r("a"))],
        };
        let store = CorrespondenceStore::from_snapshot(&snapshot);
        assert!(store.correspond(&r("a"), &r("b")));
        assert!(!store.incorrespondent(&r("a"), &r("b")));
    }
}
