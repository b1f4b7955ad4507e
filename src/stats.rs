use crate::person::{PersonId, Sex};
use crate::records::RecordStore;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const AGE_BUCKET: i64 = 10;
const DECADE: i32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenderDistribution {
    pub male: usize,
    pub female: usize,
    /// Blank or unrecognised sex cells, left out of the ratio
    pub unknown: usize,
    /// Males per female, two decimals; `None` when there are no females
    pub ratio: Option<f64>,
}

impl GenderDistribution {
    pub fn ratio_label(&self) -> String {
        match self.ratio {
            Some(ratio) => format!("{:.2}", ratio),
            None => "N/A".to_string(),
        }
    }
}

/// Everything shown on the statistics page
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FamilyStatistics {
    pub total: usize,
    pub gender: GenderDistribution,
    pub living: usize,
    pub deceased: usize,
    /// Count per age bucket, keyed by the bucket's lower bound
    pub age_buckets: BTreeMap<i64, usize>,
    pub unknown_age: usize,
    /// Count per decade, keyed by the decade's first year
    pub births_per_decade: BTreeMap<i32, usize>,
    pub average_age: Option<f64>,
    /// People with no father in the sheet
    pub root_ancestors: usize,
    /// Generations in the longest father-to-child chain
    pub deepest_lineage: usize,
}

pub fn gender_distribution(store: &RecordStore) -> GenderDistribution {
    let count = |sex: Sex| store.iter().filter(|r| r.sex == sex).count();
    let male = count(Sex::Male);
    let female = count(Sex::Female);
    let ratio = (female > 0).then(|| (male as f64 / female as f64 * 100.0).round() / 100.0);
    GenderDistribution {
        male,
        female,
        unknown: store.len() - male - female,
        ratio,
    }
}

/// Computes the statistics page figures with ages measured at `today`
pub fn compute(store: &RecordStore, today: NaiveDate) -> FamilyStatistics {
    let mut age_buckets = BTreeMap::new();
    let mut births_per_decade = BTreeMap::new();
    let mut unknown_age = 0;
    let mut age_sum = 0i64;
    let mut aged = 0usize;

    for record in store.iter() {
        match record.age_on(today) {
            Some(age) if age >= 0 => {
                *age_buckets.entry(age.div_euclid(AGE_BUCKET) * AGE_BUCKET).or_insert(0) += 1;
                age_sum += age;
                aged += 1;
            }
            _ => unknown_age += 1,
        }
        if let Some(birth) = record.birth {
            let decade = birth.year().div_euclid(DECADE) * DECADE;
            *births_per_decade.entry(decade).or_insert(0) += 1;
        }
    }

    let deceased = store.iter().filter(|r| r.is_deceased()).count();
    let root_ancestors = store
        .iter()
        .filter(|r| r.father_id.as_ref().is_none_or(|father| !store.contains(father)))
        .count();

    FamilyStatistics {
        total: store.len(),
        gender: gender_distribution(store),
        living: store.len() - deceased,
        deceased,
        age_buckets,
        unknown_age,
        births_per_decade,
        average_age: (aged > 0).then(|| age_sum as f64 / aged as f64),
        root_ancestors,
        deepest_lineage: deepest_lineage(store),
    }
}

/// Length in generations of the longest chain of father links
///
/// Chains that loop back on themselves are cut where they revisit a person.
pub fn deepest_lineage(store: &RecordStore) -> usize {
    let mut depth: HashMap<&PersonId, usize> = HashMap::new();

    for record in store.iter() {
        if depth.contains_key(&record.id) {
            continue;
        }

        // Walk up until a person with a known depth, the top, or a repeat
        let mut chain: Vec<&PersonId> = vec![&record.id];
        let mut base = 0;
        let mut current = &record.id;
        while let Some(father) = store.father_of(current) {
            let Some(father_record) = store.get(father) else {
                break;
            };
            if let Some(&known) = depth.get(&father_record.id) {
                base = known;
                break;
            }
            if chain.contains(&&father_record.id) {
                break;
            }
            chain.push(&father_record.id);
            current = &father_record.id;
        }

        for (offset, id) in chain.iter().rev().enumerate() {
            depth.insert(*id, base + offset + 1);
        }
    }

    depth.values().copied().max().unwrap_or(0)
}

/// Human-readable bucket label such as `"20-29"`
pub fn age_bucket_label(lower: i64) -> String {
    format!("{}-{}", lower, lower + AGE_BUCKET - 1)
}

pub fn decade_label(decade: i32) -> String {
    format!("{}s", decade)
}
