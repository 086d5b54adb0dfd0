use super::reader::read_from;
use super::record::{ConnectionRecord, NUMERIC_COUNT};
use super::split::train_test_split;
use super::{numeric_columns, COLUMN_LAYOUT};
use crate::logic::error::IdsError;

const NORMAL_ROW: &str = "0,tcp,ftp_data,SF,491,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2,2,0.00,0.00,0.00,0.00,1.00,0.00,0.00,150,25,0.17,0.03,0.17,0.00,0.00,0.00,0.05,0.00,normal,20";
const NEPTUNE_ROW: &str = "0,udp,private,S0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,123,6,1.00,1.00,0.00,0.00,0.05,0.07,0.00,255,26,0.10,0.05,0.00,0.00,1.00,1.00,0.00,0.00,neptune,19";

#[test]
fn test_layout_counts() {
    assert_eq!(COLUMN_LAYOUT.len(), 43);
    assert_eq!(numeric_columns().len(), NUMERIC_COUNT);
}

#[test]
fn test_parse_normal_row() {
    let fields: Vec<&str> = NORMAL_ROW.split(',').collect();
    let record = ConnectionRecord::from_fields(0, &fields).unwrap();

    assert_eq!(record.numeric.len(), NUMERIC_COUNT);
    assert_eq!(record.category("protocol_type"), Some("tcp"));
    assert_eq!(record.category("service"), Some("ftp_data"));
    assert_eq!(record.category("land"), Some("0"));
    assert_eq!(record.level, Some(20));
    assert_eq!(record.label(), 0);
}

#[test]
fn test_non_normal_outcome_is_attack() {
    let fields: Vec<&str> = NEPTUNE_ROW.split(',').collect();
    let record = ConnectionRecord::from_fields(0, &fields).unwrap();
    assert_eq!(record.label(), 1);

    let other = ConnectionRecord::builder().outcome("smurf").build();
    assert_eq!(other.label(), 1);
}

#[test]
fn test_flag_levels_are_canonical() {
    let row = NORMAL_ROW.replacen(",SF,491,0,0,", ",SF,491,0,1.0,", 1);
    let fields: Vec<&str> = row.split(',').collect();
    let record = ConnectionRecord::from_fields(0, &fields).unwrap();
    assert_eq!(record.category("land"), Some("1"));
}

#[test]
fn test_reject_wrong_column_count() {
    let csv = "0,tcp,http,SF,normal\n";
    let result = read_from(csv.as_bytes(), false);
    match result {
        Err(IdsError::InvalidRecord { row, .. }) => assert_eq!(row, 0),
        other => panic!("Expected InvalidRecord, got {:?}", other),
    }
}

#[test]
fn test_reject_non_numeric_field() {
    let row = NORMAL_ROW.replacen("491", "lots", 1);
    let result = read_from(row.as_bytes(), false);
    assert!(matches!(result, Err(IdsError::InvalidRecord { .. })));
}

/// NORMAL_ROW with field `index` replaced by `value`
fn with_field(index: usize, value: &str) -> Vec<String> {
    let mut fields: Vec<String> = NORMAL_ROW.split(',').map(String::from).collect();
    fields[index] = value.to_string();
    fields
}

#[test]
fn test_reject_non_finite_numeric() {
    // duration, src_bytes
    for (index, value) in [(0, "NaN"), (4, "inf"), (4, "-infinity")] {
        let result = ConnectionRecord::from_fields(3, &with_field(index, value));
        assert!(
            matches!(result, Err(IdsError::InvalidRecord { row: 3, .. })),
            "accepted '{}' at column {}",
            value,
            index
        );
    }
}

#[test]
fn test_reject_fractional_or_non_finite_flag() {
    // land, logged_in
    for (index, value) in [(6, "1.7"), (11, "nan"), (11, "inf")] {
        let result = ConnectionRecord::from_fields(0, &with_field(index, value));
        assert!(
            matches!(result, Err(IdsError::InvalidRecord { .. })),
            "accepted flag '{}' at column {}",
            value,
            index
        );
    }
}

#[test]
fn test_read_headerless_csv() {
    let csv = format!("{}\n{}\n", NORMAL_ROW, NEPTUNE_ROW);
    let records = read_from(csv.as_bytes(), false).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(super::labels(&records), vec![0, 1]);
}

#[test]
fn test_read_csv_with_header() {
    let header = COLUMN_LAYOUT.join(",");
    let csv = format!("{}\n{}\n", header, NORMAL_ROW);
    let records = read_from(csv.as_bytes(), true).unwrap();
    assert_eq!(records.len(), 1);

    let bad_header = header.replace("duration", "dur");
    let csv = format!("{}\n{}\n", bad_header, NORMAL_ROW);
    assert!(read_from(csv.as_bytes(), true).is_err());
}

#[test]
fn test_empty_input() {
    assert!(matches!(read_from("".as_bytes(), false), Err(IdsError::EmptyDataset(_))));
}

#[test]
fn test_split_sizes_and_disjointness() {
    let split = train_test_split(10, 0.2, 42).unwrap();
    assert_eq!(split.test.len(), 2);
    assert_eq!(split.train.len(), 8);

    let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
    all.sort();
    assert_eq!(all, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_split_is_seeded() {
    let a = train_test_split(100, 0.2, 7).unwrap();
    let b = train_test_split(100, 0.2, 7).unwrap();
    assert_eq!(a.test, b.test);
}

#[test]
fn test_split_rejects_tiny_input() {
    assert!(train_test_split(1, 0.2, 42).is_err());
    assert!(train_test_split(10, 0.0, 42).is_err());
}
