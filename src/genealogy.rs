use crate::person::PersonId;
use crate::records::RecordStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Which way to walk from the focal person
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Descendants,
    Ancestors,
    Both,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "descendants" | "descend" | "down" => Ok(Direction::Descendants),
            "ancestors" | "ascend" | "up" => Ok(Direction::Ancestors),
            "both" | "all" => Ok(Direction::Both),
            other => Err(format!("Unknown tree direction: {}", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Descendants => "descendants",
            Direction::Ancestors => "ancestors",
            Direction::Both => "both",
        };
        f.write_str(name)
    }
}

/// Person ids grouped by signed generation offset from the focal person
///
/// Offset 0 is the focal person, positive offsets are descendants and
/// negative offsets are ancestors. Within a generation ids keep the order
/// they were discovered in, and no id is stored in two generations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenerationMap {
    generations: BTreeMap<i32, Vec<PersonId>>,
}

impl GenerationMap {
    pub fn rooted(root: PersonId) -> Self {
        let mut generations = BTreeMap::new();
        generations.insert(0, vec![root]);
        GenerationMap { generations }
    }

    pub fn get(&self, offset: i32) -> Option<&[PersonId]> {
        self.generations.get(&offset).map(Vec::as_slice)
    }

    /// Generations from the most distant ancestor to the most distant descendant
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[PersonId])> {
        self.generations
            .iter()
            .map(|(offset, ids)| (*offset, ids.as_slice()))
    }

    pub fn offsets(&self) -> Vec<i32> {
        self.generations.keys().copied().collect()
    }

    /// Number of generations present
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn person_count(&self) -> usize {
        self.generations.values().map(Vec::len).sum()
    }

    pub fn generation_of(&self, id: &PersonId) -> Option<i32> {
        self.generations
            .iter()
            .find(|(_, ids)| ids.contains(id))
            .map(|(offset, _)| *offset)
    }

    fn insert(&mut self, offset: i32, ids: Vec<PersonId>) {
        self.generations.insert(offset, ids);
    }

    fn negated(self) -> Self {
        GenerationMap {
            generations: self
                .generations
                .into_iter()
                .map(|(offset, ids)| (-offset, ids))
                .collect(),
        }
    }
}

/// Walks down the father links from `root`
///
/// # Arguments
/// * `store` - Loaded records
/// * `root` - Focal person
/// * `max_generations` - How many generations below the root to collect
///
/// # Returns
/// * `GenerationMap` keyed 0..=n; stops at the first empty generation
pub fn descend(store: &RecordStore, root: &PersonId, max_generations: u32) -> GenerationMap {
    let mut map = GenerationMap::rooted(root.clone());
    let mut seen: HashSet<PersonId> = HashSet::from([root.clone()]);
    let mut previous = vec![root.clone()];

    for generation in 1..=max_generations {
        let mut current = Vec::new();
        for parent in &previous {
            for child in store.children_of(parent) {
                // A cyclic father chain would otherwise loop forever
                if seen.insert(child.id.clone()) {
                    current.push(child.id.clone());
                }
            }
        }

        if current.is_empty() {
            break;
        }
        map.insert(generation as i32, current.clone());
        previous = current;
    }

    map
}

/// Walks up the father links from `root`
///
/// Generations are keyed positively (1 = father, 2 = grandfather). A
/// father id that names nobody in the store ends that branch.
///
/// # Arguments
/// * `store` - Loaded records
/// * `root` - Focal person
/// * `max_generations` - How many generations above the root to collect
pub fn ascend(store: &RecordStore, root: &PersonId, max_generations: u32) -> GenerationMap {
    let mut map = GenerationMap::rooted(root.clone());
    let mut seen: HashSet<PersonId> = HashSet::from([root.clone()]);
    let mut previous = vec![root.clone()];

    for generation in 1..=max_generations {
        let mut current = Vec::new();
        for child in &previous {
            let Some(father) = store.father_of(child) else {
                continue;
            };
            if !store.contains(father) {
                log::debug!("father {} of {} is not in the sheet", father, child);
                continue;
            }
            if seen.insert(father.clone()) {
                current.push(father.clone());
            }
        }

        if current.is_empty() {
            break;
        }
        map.insert(generation as i32, current.clone());
        previous = current;
    }

    map
}

/// Combines an [`ascend`] result and a [`descend`] result around the same root
///
/// Ancestor generation `g` moves to offset `-g`. When an id shows up on both
/// sides (a cycle in the sheet) the descendant placement is kept and the id
/// is removed from the ancestor generations.
pub fn merge(ancestors: GenerationMap, descendants: GenerationMap) -> GenerationMap {
    let below: HashSet<&PersonId> = descendants
        .generations
        .values()
        .flatten()
        .collect();

    let mut merged = GenerationMap::default();
    for (offset, ids) in &ancestors.generations {
        if *offset == 0 {
            continue;
        }
        let kept: Vec<PersonId> = ids.iter().filter(|id| !below.contains(id)).cloned().collect();
        if !kept.is_empty() {
            merged.insert(-offset, kept);
        }
    }

    if !descendants.generations.contains_key(&0) {
        if let Some(root) = ancestors.generations.get(&0) {
            merged.insert(0, root.clone());
        }
    }
    for (offset, ids) in descendants.generations {
        merged.insert(offset, ids);
    }

    merged
}

/// Collects the generations to display for one tree view
pub fn extract(
    store: &RecordStore,
    root: &PersonId,
    direction: Direction,
    max_generations: u32,
) -> GenerationMap {
    match direction {
        Direction::Descendants => descend(store, root, max_generations),
        Direction::Ancestors => ascend(store, root, max_generations).negated(),
        Direction::Both => merge(
            ascend(store, root, max_generations),
            descend(store, root, max_generations),
        ),
    }
}
