use crate::genealogy::GenerationMap;
use crate::person::{PersonId, PersonRecord, Sex, UNKNOWN_NAME};
use crate::records::RecordStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Parallel sequences describing a radial tree, parents before children
///
/// All five vectors have the same length. A root of the radial layout has
/// an empty string in `parents`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FlattenedTree {
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub sexes: Vec<Sex>,
    pub hover_texts: Vec<String>,
}

/// One row of a [`FlattenedTree`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatNode<'a> {
    pub id: &'a str,
    pub label: &'a str,
    pub parent: Option<&'a str>,
    pub sex: Sex,
    pub hover: &'a str,
}

impl FlattenedTree {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = FlatNode<'_>> {
        (0..self.ids.len()).map(move |i| FlatNode {
            id: &self.ids[i],
            label: &self.labels[i],
            parent: Some(self.parents[i].as_str()).filter(|p| !p.is_empty()),
            sex: self.sexes[i],
            hover: &self.hover_texts[i],
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.ids
            .iter()
            .zip(&self.parents)
            .filter(|(_, parent)| parent.is_empty())
            .map(|(id, _)| id.as_str())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    fn push(&mut self, id: String, label: String, parent: String, sex: Sex, hover: String) {
        self.ids.push(id);
        self.labels.push(label);
        self.parents.push(parent);
        self.sexes.push(sex);
        self.hover_texts.push(hover);
    }
}

/// Turns a generation map into the sequences a sunburst chart consumes
///
/// Generations are emitted from the most distant ancestor downwards, so a
/// node's parent is always emitted first. A node's parent is the person in
/// an earlier generation whose children include it; the only candidate is
/// the node's own father, looked up through an id to generation index.
///
/// # Arguments
/// * `store` - Loaded records, used for names, dates and father links
/// * `tree` - Output of the genealogy extractor
///
/// # Returns
/// * `FlattenedTree` with one entry per distinct id in `tree`
pub fn flatten(store: &RecordStore, tree: &GenerationMap) -> FlattenedTree {
    let mut generation_of: HashMap<&PersonId, i32> = HashMap::new();
    for (offset, ids) in tree.iter() {
        for id in ids {
            generation_of.entry(id).or_insert(offset);
        }
    }

    let mut flat = FlattenedTree::default();
    let mut emitted: HashSet<&PersonId> = HashSet::new();

    for (offset, ids) in tree.iter() {
        for id in ids {
            if !emitted.insert(id) {
                continue;
            }

            let record = store.get(id);
            let parent = record
                .and_then(|r| r.father_id.as_ref())
                .filter(|father| {
                    generation_of
                        .get(father)
                        .is_some_and(|&father_offset| father_offset < offset)
                })
                .map(|father| father.to_string())
                .unwrap_or_default();

            flat.push(
                id.to_string(),
                node_label(id, record),
                parent,
                record.map(|r| r.sex).unwrap_or_default(),
                hover_text(id, record),
            );
        }
    }

    flat
}

/// Compact ring label: name, id, then whichever years are known
pub fn node_label(id: &PersonId, record: Option<&PersonRecord>) -> String {
    let mut parts = vec![
        record.map_or(UNKNOWN_NAME, PersonRecord::display_name).to_string(),
        id.to_string(),
    ];
    if let Some(year) = record.and_then(PersonRecord::birth_year) {
        parts.push(year.to_string());
    }
    if let Some(year) = record.and_then(PersonRecord::death_year) {
        parts.push(year.to_string());
    }
    parts.join(" ")
}

/// Tooltip text, one fact per line
pub fn hover_text(id: &PersonId, record: Option<&PersonRecord>) -> String {
    let Some(record) = record else {
        return format!("{}\nID: {}", UNKNOWN_NAME, id);
    };

    let mut lines = vec![record.display_name().to_string(), format!("ID: {}", id)];
    if let Some(father) = &record.father_id {
        lines.push(format!("Father ID: {}", father));
    }
    if let Some(year) = record.birth_year() {
        lines.push(year.to_string());
    }
    if let Some(year) = record.death_year() {
        lines.push(year.to_string());
    }
    for (_, value) in record.non_empty_extras() {
        lines.push(value.to_string());
    }
    lines.join("\n")
}
