use crate::person::{PersonId, PersonRecord};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref SELECTION_REGEX: Regex = Regex::new(r"^\s*\[([^\]]+)\]").unwrap();
}

/// Read-only table of person records for one loaded source
///
/// Records keep their sheet order. Lookups by id and by father id are
/// indexed once at construction so the genealogy walks never rescan the
/// table.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: Vec<PersonRecord>,
    extra_columns: Vec<String>,
    by_id: HashMap<PersonId, usize>,
    children: HashMap<PersonId, Vec<usize>>,
}

impl RecordStore {
    /// Builds a store from rows in sheet order
    ///
    /// The first row carrying a given id wins; later rows with the same id
    /// are dropped and logged.
    ///
    /// # Arguments
    /// * `rows` - Parsed person records
    /// * `extra_columns` - Names of the non-canonical columns, in sheet order
    pub fn new(rows: Vec<PersonRecord>, extra_columns: Vec<String>) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut by_id = HashMap::with_capacity(rows.len());

        for record in rows {
            if by_id.contains_key(&record.id) {
                log::warn!("dropping duplicate row for id {}", record.id);
                continue;
            }
            by_id.insert(record.id.clone(), records.len());
            records.push(record);
        }

        let mut children: HashMap<PersonId, Vec<usize>> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            if let Some(father) = &record.father_id {
                children.entry(father.clone()).or_default().push(index);
            }
        }

        RecordStore {
            records,
            extra_columns,
            by_id,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonRecord> {
        self.records.iter()
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn get(&self, id: &PersonId) -> Option<&PersonRecord> {
        self.by_id.get(id).map(|&index| &self.records[index])
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Records whose father is `id`, in sheet order
    pub fn children_of<'a>(&'a self, id: &PersonId) -> impl Iterator<Item = &'a PersonRecord> + 'a {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&index| &self.records[index])
    }

    /// The father id written on `id`'s row, which may point at nobody
    pub fn father_of(&self, id: &PersonId) -> Option<&PersonId> {
        self.get(id).and_then(|record| record.father_id.as_ref())
    }

    /// Selection list entries, one `"[id] name"` per person
    pub fn selection_options(&self) -> Vec<String> {
        self.records
            .iter()
            .map(selection_label)
            .collect()
    }
}

pub fn selection_label(record: &PersonRecord) -> String {
    format!("[{}] {}", record.id, record.display_name())
}

/// Extracts the id back out of a `"[id] name"` selection entry
pub fn parse_selection(option: &str) -> Option<PersonId> {
    SELECTION_REGEX
        .captures(option)
        .and_then(|caps| PersonId::parse(&caps[1]))
}
