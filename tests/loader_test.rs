mod common;

use common::{FAMILY_CSV, id};
use family_tree::cache::{CacheKey, RecordCache};
use family_tree::loader::{self, LoadError, RecordSource, build_store, from_csv, from_csv_str};
use family_tree::person::Sex;
use family_tree::records::{parse_selection, selection_label};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

fn csv_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn raw_headers_map_onto_canonical_columns() {
    let csv = "\
 ID ,Full Name,Sex (M/F),Father ID,Date of Birth,Date of Death,Village
1,Ahmad,M,,1900,1970,Nablus
2,Mona,F,1,1930-02-02,,
";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();

    assert_eq!(store.len(), 2);
    let mona = store.get(&id("2")).unwrap();
    assert_eq!(mona.name.as_deref(), Some("Mona"));
    assert_eq!(mona.sex, Sex::Female);
    assert_eq!(mona.father_id, Some(id("1")));
    assert_eq!(mona.birth_year(), Some(1930));
    assert_eq!(store.extra_columns(), ["Village".to_string()]);
    assert_eq!(store.get(&id("1")).unwrap().extra("Village"), Some("Nablus"));
}

#[test]
fn repeated_columns_keep_first_occurrence() {
    let csv = "\
id,name,sex,father_id,birth,death,Notes,name,Notes
1,Ahmad,M,,,,first,Other,second
";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();
    let ahmad = store.get(&id("1")).unwrap();

    assert_eq!(ahmad.name.as_deref(), Some("Ahmad"));
    assert_eq!(ahmad.extras, vec![("Notes".to_string(), "first".to_string())]);
}

#[test]
fn rows_without_id_are_excluded() {
    let csv = "\
id,name,sex,father_id,birth,death
1,Ahmad,M,,,
,Nobody,M,1,,
  ,Blank,F,1,,
2,Salim,M,1,,
";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.children_of(&id("1")).count(), 1);
}

#[test]
fn duplicate_ids_keep_first_row() {
    let csv = "id,name,sex,father_id,birth,death\n1,Ahmad,M,,,\n1,Impostor,M,,,\n";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&id("1")).unwrap().display_name(), "Ahmad");
}

#[test]
fn missing_column_fails_the_load() {
    let csv = "id,name,sex,father_id,birth\n1,Ahmad,M,,1900\n";
    match build_store(from_csv_str(csv).unwrap()) {
        Err(LoadError::MissingColumns(columns)) => assert_eq!(columns, vec!["death".to_string()]),
        other => panic!("expected missing column error, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn float_ids_match_integer_father_references() {
    let csv = "id,name,sex,father_id,birth,death\n12.0,Ahmad,M,,,\n13,Salim,M,12,,\n";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();

    assert!(store.contains(&id("12")));
    assert_eq!(store.children_of(&id("12")).count(), 1);
}

#[test]
fn quoted_fields_keep_commas_quotes_and_newlines() {
    let csv = "\u{feff}id,name,sex,father_id,birth,death,bio\r\n1,\"Ahmad, the elder\",M,,,,\"said \"\"hello\"\"\nand left\"\r\n";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();
    let ahmad = store.get(&id("1")).unwrap();

    assert_eq!(ahmad.display_name(), "Ahmad, the elder");
    assert_eq!(ahmad.extra("bio"), Some("said \"hello\"\nand left"));
}

#[test]
fn dates_outside_window_are_dropped() {
    let csv = "id,name,sex,father_id,birth,death\n1,A,M,,1899-12-31,2025-01-02\n2,B,M,,01/02/1950,not a date\n";
    let store = build_store(from_csv_str(csv).unwrap()).unwrap();

    assert_eq!(store.get(&id("1")).unwrap().birth, None);
    assert_eq!(store.get(&id("1")).unwrap().death, None);
    assert_eq!(store.get(&id("2")).unwrap().birth_year(), Some(1950));
    assert_eq!(store.get(&id("2")).unwrap().death, None);
}

#[test]
fn selection_labels_round_trip_to_ids() {
    let store = build_store(from_csv_str(FAMILY_CSV).unwrap()).unwrap();
    let options = store.selection_options();

    assert_eq!(options[0], "[1] Ahmad");
    assert_eq!(selection_label(store.get(&id("3")).unwrap()), "[3] Mona");
    assert_eq!(parse_selection("[3] Mona"), Some(id("3")));
    assert_eq!(parse_selection("Mona"), None);
}

#[test]
fn detect_picks_source_kind() {
    assert_eq!(
        RecordSource::detect("family.CSV").unwrap(),
        RecordSource::CsvFile(PathBuf::from("family.CSV"))
    );
    assert_eq!(
        RecordSource::detect("data/family.xlsx").unwrap(),
        RecordSource::ExcelFile(PathBuf::from("data/family.xlsx"))
    );
    assert!(matches!(
        RecordSource::detect("https://example.com/export?format=csv"),
        Ok(RecordSource::RemoteCsv(_))
    ));
    assert_eq!(
        RecordSource::detect("old/family.xls").unwrap(),
        RecordSource::ExcelFile(PathBuf::from("old/family.xls"))
    );
    assert!(matches!(RecordSource::detect("family.ods"), Ok(RecordSource::ExcelFile(_))));
    assert!(matches!(RecordSource::detect("family.txt"), Err(LoadError::Unsupported(_))));
    assert!(matches!(RecordSource::detect("family"), Err(LoadError::Unsupported(_))));
}

#[test]
fn missing_file_reports_io_error() {
    let result = from_csv("/definitely/not/here/family.csv");
    assert!(matches!(result, Err(LoadError::Io { .. })));
}

#[test]
fn empty_file_has_no_header_row() {
    let file = csv_file("");
    assert!(matches!(from_csv(file.path()), Err(LoadError::Empty(_))));
}

#[tokio::test]
async fn load_reads_csv_file() {
    let file = csv_file(FAMILY_CSV);
    let source = RecordSource::detect(file.path().to_str().unwrap()).unwrap();

    let store = loader::load(&source).await.unwrap();
    assert_eq!(store.len(), 7);
}

#[tokio::test]
async fn cache_reuses_store_until_version_changes() {
    let file = csv_file(FAMILY_CSV);
    let source = RecordSource::CsvFile(file.path().to_path_buf());
    let cache = RecordCache::new();

    let first = cache.get_or_load(CacheKey::new(&source, 0), &source).await.unwrap();
    let second = cache.get_or_load(CacheKey::new(&source, 0), &source).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let reloaded = cache.get_or_load(CacheKey::new(&source, 1), &source).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&CacheKey::new(&source, 0)).is_none());

    assert!(cache.invalidate(&CacheKey::new(&source, 1)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn late_load_of_retired_version_is_not_cached() {
    let file = csv_file(FAMILY_CSV);
    let source = RecordSource::CsvFile(file.path().to_path_buf());
    let cache = RecordCache::new();
    let stale = CacheKey::new(&source, 0);

    cache.get_or_load(stale.clone(), &source).await.unwrap();
    cache.retire(&stale);
    assert!(cache.is_empty());

    // A request that started before the reload finishes afterwards
    let store = cache.get_or_load(stale.clone(), &source).await.unwrap();
    assert_eq!(store.len(), 7);
    assert!(cache.is_empty());

    let current = cache.get_or_load(CacheKey::new(&source, 1), &source).await.unwrap();
    assert_eq!(current.len(), 7);
    assert_eq!(cache.len(), 1);
}

#[test]
fn older_version_does_not_replace_newer() {
    let source = RecordSource::CsvFile(PathBuf::from("family.csv"));
    let cache = RecordCache::new();

    cache.insert(CacheKey::new(&source, 2), build_store(from_csv_str(FAMILY_CSV).unwrap()).unwrap());
    cache.insert(CacheKey::new(&source, 1), build_store(from_csv_str(FAMILY_CSV).unwrap()).unwrap());

    assert_eq!(cache.len(), 1);
    assert!(cache.get(&CacheKey::new(&source, 2)).is_some());
}

#[tokio::test]
async fn failed_load_is_not_cached() {
    let file = csv_file("id,name\n1,Ahmad\n");
    let source = RecordSource::CsvFile(file.path().to_path_buf());
    let cache = RecordCache::new();

    let result = cache.get_or_load(CacheKey::new(&source, 0), &source).await;
    assert!(matches!(result, Err(LoadError::MissingColumns(_))));
    assert!(cache.is_empty());
}

#[test]
fn sex_cells_keep_unknown_values_apart() {
    assert_eq!(Sex::parse(" m "), Sex::Male);
    assert_eq!(Sex::parse("Female"), Sex::Female);
    assert_eq!(Sex::parse("أنثى"), Sex::Female);
    assert_eq!(Sex::parse(""), Sex::Unknown);
    assert_eq!(Sex::parse("X"), Sex::Unknown);
    assert_eq!(Sex::Unknown.code(), "");
}

#[tokio::test]
async fn load_reads_first_worksheet_of_workbook() {
    use rust_xlsxwriter::Workbook;

    let file = tempfile::Builder::new()
        .suffix(".xlsx")
        .tempfile()
        .expect("create temp file");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["ID", "Full Name", "Sex (M/F)", "Father ID", "Date of Birth", "Date of Death"]
        .iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_number(1, 0, 12.0).unwrap();
    sheet.write_string(1, 1, "Ahmad").unwrap();
    sheet.write_string(1, 2, "M").unwrap();
    sheet.write_string(1, 4, "1950-01-02").unwrap();
    sheet.write_number(2, 0, 13.0).unwrap();
    sheet.write_string(2, 1, "Mona").unwrap();
    sheet.write_string(2, 2, "F").unwrap();
    sheet.write_number(2, 3, 12.0).unwrap();
    workbook.save(file.path()).unwrap();

    let source = RecordSource::detect(file.path().to_str().unwrap()).unwrap();
    let store = loader::load(&source).await.unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get(&id("12")).unwrap().birth_year(), Some(1950));
    assert_eq!(store.children_of(&id("12")).count(), 1);
}

#[test]
fn records_serialize_dates_as_iso_strings() {
    let store = build_store(from_csv_str(FAMILY_CSV).unwrap()).unwrap();
    let value = serde_json::to_value(store.get(&id("1")).unwrap()).unwrap();

    assert_eq!(value["birth"], "1900-05-01");
    assert_eq!(value["death"], "1970-03-01");
    assert_eq!(value["sex"], "male");
}
