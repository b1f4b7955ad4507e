mod common;

use chrono::NaiveDate;
use common::{CYCLE_CSV, family, id, store_from};
use family_tree::stats::{age_bucket_label, compute, decade_label, deepest_lineage, gender_distribution};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn gender_ratio_is_males_per_female() {
    let store = family();
    let gender = gender_distribution(&store);

    assert_eq!(gender.male, 5);
    assert_eq!(gender.female, 2);
    assert_eq!(gender.ratio, Some(2.5));
    assert_eq!(gender.ratio_label(), "2.50");
}

#[test]
fn gender_ratio_without_females_is_not_available() {
    let store = store_from(CYCLE_CSV);
    let gender = gender_distribution(&store);

    assert_eq!(gender.ratio, None);
    assert_eq!(gender.ratio_label(), "N/A");
}

#[test]
fn blank_and_unrecognised_sex_are_not_counted_as_male() {
    let store = store_from(
        "id,name,sex,father_id,birth,death\n1,A,M,,,\n2,B,F,,,\n3,C,,,,\n4,D,X,,,\n",
    );
    let gender = gender_distribution(&store);

    assert_eq!(gender.male, 1);
    assert_eq!(gender.female, 1);
    assert_eq!(gender.unknown, 2);
    assert_eq!(gender.ratio_label(), "1.00");
}

#[test]
fn age_counts_whole_years_up_to_death() {
    let store = family();
    let today = date(2024, 6, 1);

    let omar = store.get(&id("6")).unwrap();
    assert_eq!(omar.age_on(today), Some(44));

    let salim = store.get(&id("2")).unwrap();
    assert_eq!(salim.age_on(today), Some(65));

    let cycle = store_from(CYCLE_CSV);
    assert_eq!(cycle.get(&id("10")).unwrap().age_on(today), None);
}

#[test]
fn figures_cover_the_whole_sheet() {
    let store = family();
    let stats = compute(&store, date(2024, 6, 1));

    assert_eq!(stats.total, 7);
    assert_eq!(stats.deceased, 2);
    assert_eq!(stats.living, 5);
    assert_eq!(stats.unknown_age, 0);
    assert_eq!(stats.root_ancestors, 2);
    assert_eq!(stats.deepest_lineage, 4);
    assert_eq!(stats.age_buckets.values().sum::<usize>(), 7);
    assert_eq!(stats.age_buckets.get(&40), Some(&1));

    let decades: Vec<(i32, usize)> = stats.births_per_decade.into_iter().collect();
    assert_eq!(
        decades,
        vec![(1900, 1), (1920, 1), (1930, 1), (1950, 2), (1960, 1), (1980, 1)]
    );
}

#[test]
fn lineage_depth_survives_cycles() {
    let store = store_from(CYCLE_CSV);
    assert_eq!(deepest_lineage(&store), 2);
}

#[test]
fn empty_sheet_has_no_averages() {
    let store = store_from("id,name,sex,father_id,birth,death\n");
    let stats = compute(&store, date(2024, 6, 1));

    assert_eq!(stats.total, 0);
    assert_eq!(stats.average_age, None);
    assert_eq!(stats.deepest_lineage, 0);
}

#[test]
fn labels_read_naturally() {
    assert_eq!(age_bucket_label(20), "20-29");
    assert_eq!(decade_label(1950), "1950s");
}
