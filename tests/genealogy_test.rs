mod common;

use common::{CYCLE_CSV, family, id, ids, store_from};
use family_tree::genealogy::{Direction, ascend, descend, extract, merge};

#[test]
fn descend_groups_children_by_generation() {
    let store = family();
    let tree = descend(&store, &id("1"), 3);

    assert_eq!(tree.offsets(), vec![0, 1, 2, 3]);
    assert_eq!(tree.get(0), Some(ids(&["1"]).as_slice()));
    assert_eq!(tree.get(1), Some(ids(&["2", "3"]).as_slice()));
    assert_eq!(tree.get(2), Some(ids(&["4", "5"]).as_slice()));
    assert_eq!(tree.get(3), Some(ids(&["6"]).as_slice()));
}

#[test]
fn descend_respects_generation_limit() {
    let store = family();
    let tree = descend(&store, &id("1"), 2);

    assert_eq!(tree.offsets(), vec![0, 1, 2]);
    assert!(tree.get(3).is_none());
    assert!(tree.iter().all(|(offset, _)| offset <= 2));
}

#[test]
fn descend_stops_at_first_empty_generation() {
    let store = family();
    let tree = descend(&store, &id("6"), 5);

    assert_eq!(tree.offsets(), vec![0]);
    assert_eq!(tree.person_count(), 1);
}

#[test]
fn ascend_follows_fathers_upwards() {
    let store = family();
    let tree = ascend(&store, &id("6"), 3);

    assert_eq!(tree.get(1), Some(ids(&["4"]).as_slice()));
    assert_eq!(tree.get(2), Some(ids(&["2"]).as_slice()));
    assert_eq!(tree.get(3), Some(ids(&["1"]).as_slice()));
}

#[test]
fn ascend_ignores_father_missing_from_sheet() {
    let store = family();
    let tree = ascend(&store, &id("7"), 3);

    assert_eq!(tree.offsets(), vec![0]);
    assert_eq!(tree.generation_of(&id("99")), None);
}

#[test]
fn ancestors_direction_uses_negative_offsets() {
    let store = family();
    let tree = extract(&store, &id("6"), Direction::Ancestors, 2);

    assert_eq!(tree.offsets(), vec![-2, -1, 0]);
    assert_eq!(tree.get(-1), Some(ids(&["4"]).as_slice()));
    assert_eq!(tree.get(-2), Some(ids(&["2"]).as_slice()));
}

#[test]
fn both_direction_merges_around_root() {
    let store = family();
    let tree = extract(&store, &id("2"), Direction::Both, 2);

    assert_eq!(tree.offsets(), vec![-1, 0, 1, 2]);
    assert_eq!(tree.get(-1), Some(ids(&["1"]).as_slice()));
    assert_eq!(tree.get(0), Some(ids(&["2"]).as_slice()));
    assert_eq!(tree.get(1), Some(ids(&["4", "5"]).as_slice()));
    assert_eq!(tree.get(2), Some(ids(&["6"]).as_slice()));
}

#[test]
fn generation_zero_holds_only_the_root() {
    let store = family();
    for direction in [Direction::Descendants, Direction::Ancestors, Direction::Both] {
        for person in ["1", "4", "7"] {
            let tree = extract(&store, &id(person), direction, 3);
            assert_eq!(tree.get(0), Some(ids(&[person]).as_slice()), "{} {}", direction, person);
        }
    }
}

#[test]
fn no_person_appears_in_two_generations() {
    let store = family();
    let tree = extract(&store, &id("4"), Direction::Both, 5);

    let mut all: Vec<_> = tree.iter().flat_map(|(_, ids)| ids.iter().cloned()).collect();
    let count = all.len();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), count);
}

#[test]
fn cyclic_fathers_terminate() {
    let store = store_from(CYCLE_CSV);

    let down = descend(&store, &id("10"), 10);
    assert_eq!(down.offsets(), vec![0, 1]);
    assert_eq!(down.get(1), Some(ids(&["11"]).as_slice()));

    let up = ascend(&store, &id("10"), 10);
    assert_eq!(up.offsets(), vec![0, 1]);
}

#[test]
fn merge_keeps_descendant_placement_on_collision() {
    let store = store_from(CYCLE_CSV);
    let merged = merge(ascend(&store, &id("10"), 3), descend(&store, &id("10"), 3));

    assert_eq!(merged.generation_of(&id("11")), Some(1));
    assert!(merged.get(-1).is_none());
    assert_eq!(merged.person_count(), 2);
}

#[test]
fn direction_parses_form_values() {
    assert_eq!("descendants".parse::<Direction>(), Ok(Direction::Descendants));
    assert_eq!("Ancestors".parse::<Direction>(), Ok(Direction::Ancestors));
    assert_eq!(" both ".parse::<Direction>(), Ok(Direction::Both));
    assert!("sideways".parse::<Direction>().is_err());
    assert_eq!(Direction::default(), Direction::Descendants);
    assert_eq!(Direction::Both.to_string(), "both");
}

const SMALL_CSV: &str = "\
id,name,sex,father_id,birth,death
1,Root,M,,,
2,Son,M,1,,
3,Daughter,F,1,,
4,Grandson,M,2,,
";

#[test]
fn zero_generations_is_just_the_root() {
    let store = store_from(SMALL_CSV);
    let tree = descend(&store, &id("1"), 0);

    assert_eq!(tree.offsets(), vec![0]);
    assert_eq!(tree.get(0), Some(ids(&["1"]).as_slice()));
}

#[test]
fn small_table_descends_two_generations() {
    let store = store_from(SMALL_CSV);
    let tree = descend(&store, &id("1"), 2);

    assert_eq!(tree.offsets(), vec![0, 1, 2]);
    assert_eq!(tree.get(1), Some(ids(&["2", "3"]).as_slice()));
    assert_eq!(tree.get(2), Some(ids(&["4"]).as_slice()));
}

#[test]
fn small_table_ascends_to_the_top() {
    let store = store_from(SMALL_CSV);
    let tree = ascend(&store, &id("4"), 5);

    assert_eq!(tree.offsets(), vec![0, 1, 2]);
    assert_eq!(tree.get(1), Some(ids(&["2"]).as_slice()));
    assert_eq!(tree.get(2), Some(ids(&["1"]).as_slice()));
}

#[test]
fn merged_root_is_the_focal_person() {
    let store = store_from(SMALL_CSV);
    let merged = merge(ascend(&store, &id("2"), 3), descend(&store, &id("2"), 3));

    assert_eq!(merged.get(0), Some(ids(&["2"]).as_slice()));
    assert_eq!(merged.get(-1), Some(ids(&["1"]).as_slice()));
    assert_eq!(merged.get(1), Some(ids(&["4"]).as_slice()));
}
