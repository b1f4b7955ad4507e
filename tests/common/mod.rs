#![allow(dead_code)]

use family_tree::PersonId;
use family_tree::loader::{build_store, from_csv_str};
use family_tree::records::RecordStore;

/// Three generations under Ahmad plus one person whose father is not in
/// the sheet
pub const FAMILY_CSV: &str = "\
id,name,sex,father_id,birth,death,nickname
1,Ahmad,M,,1900-05-01,1970-03-01,Abu Salim
2,Salim,M,1,1925,1990,
3,Mona,F,1,1930-02-02,,
4,Khaled,M,2,1950,,
5,Huda,F,2,1955,,
6,Omar,M,4,1980,,
7,Yusuf,M,99,1960,,
";

/// Two people who are each other's father
pub const CYCLE_CSV: &str = "\
id,name,sex,father_id,birth,death
10,Adam,M,11,,
11,Bilal,M,10,,
";

pub fn store_from(csv: &str) -> RecordStore {
    let table = from_csv_str(csv).expect("fixture has a header row");
    build_store(table).expect("fixture has every required column")
}

pub fn family() -> RecordStore {
    store_from(FAMILY_CSV)
}

pub fn id(raw: &str) -> PersonId {
    PersonId::parse(raw).expect("fixture ids are not blank")
}

pub fn ids(raw: &[&str]) -> Vec<PersonId> {
    raw.iter().map(|r| id(r)).collect()
}
