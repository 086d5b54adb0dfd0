use ndarray::{array, Array2};

use super::*;
use crate::logic::dataset::{ConnectionRecord, NUMERIC_COUNT};
use crate::logic::error::IdsError;

fn sample_records() -> Vec<ConnectionRecord> {
    vec![
        ConnectionRecord::builder().protocol_type("tcp").service("http").flag("SF").build(),
        ConnectionRecord::builder()
            .protocol_type("udp")
            .service("private")
            .flag("S0")
            .outcome("neptune")
            .build(),
        ConnectionRecord::builder()
            .protocol_type("icmp")
            .service("ecr_i")
            .flag("SF")
            .category("logged_in", "1")
            .outcome("smurf")
            .build(),
        ConnectionRecord::builder().protocol_type("tcp").service("ftp").flag("REJ").build(),
    ]
}

// ============================================================================
// ENCODER
// ============================================================================

#[test]
fn test_encoder_column_order() {
    let encoder = FeatureEncoder::fit(&sample_records(), VocabularyScope::FullDataset).unwrap();
    let columns = &encoder.schema().columns;

    assert_eq!(columns[0], "duration");
    assert_eq!(columns[NUMERIC_COUNT], "protocol_type_icmp");
    assert_eq!(columns[NUMERIC_COUNT + 1], "protocol_type_tcp");
    assert_eq!(columns[NUMERIC_COUNT + 2], "protocol_type_udp");

    // 34 numeric + 3 protocols + 4 services + 3 flags + land(1) + logged_in(2)
    // + is_guest_login(1) + is_host_login(1)
    assert_eq!(encoder.width(), NUMERIC_COUNT + 3 + 4 + 3 + 1 + 2 + 1 + 1);
    assert!(encoder.schema().index_of("logged_in_0").unwrap() < encoder.schema().index_of("logged_in_1").unwrap());
}

#[test]
fn test_encoder_width_invariant_across_partitions() {
    let records = sample_records();
    let encoder = FeatureEncoder::fit(&records, VocabularyScope::FullDataset).unwrap();

    let train = encoder.encode(&records[..3]).unwrap();
    let test = encoder.encode(&records[3..]).unwrap();
    assert_eq!(train.ncols(), encoder.width());
    assert_eq!(test.ncols(), encoder.width());

    // exactly one indicator per categorical column is hot
    let hot: f64 = test.row(0).iter().skip(NUMERIC_COUNT).sum();
    assert_eq!(hot, 7.0);
}

#[test]
fn test_mixed_levels_sort_lexicographically() {
    // 9 < 10 by value, "10" < "1a" < "9" as text: no single comparator fits
    let services = ["9", "10", "1a", "N", "Na", "100-N"];
    let records: Vec<ConnectionRecord> = (0..60)
        .map(|i| ConnectionRecord::builder().service(services[i % services.len()]).build())
        .collect();
    let encoder = FeatureEncoder::fit(&records, VocabularyScope::FullDataset).unwrap();

    let position = |level: &str| encoder.schema().index_of(&format!("service_{}", level)).unwrap();
    assert!(position("10") < position("100-N"));
    assert!(position("100-N") < position("1a"));
    assert!(position("1a") < position("9"));
    assert!(position("9") < position("N"));
    assert!(position("N") < position("Na"));
}

#[test]
fn test_numeric_levels_sort_by_value() {
    let records: Vec<ConnectionRecord> = ["10", "9", "2.5"]
        .iter()
        .map(|s| ConnectionRecord::builder().service(s).build())
        .collect();
    let encoder = FeatureEncoder::fit(&records, VocabularyScope::FullDataset).unwrap();

    let position = |level: &str| encoder.schema().index_of(&format!("service_{}", level)).unwrap();
    assert!(position("2.5") < position("9"));
    assert!(position("9") < position("10"));
}

#[test]
fn test_unseen_level_is_schema_error() {
    let encoder = FeatureEncoder::fit(&sample_records(), VocabularyScope::FullDataset).unwrap();
    let record = ConnectionRecord::builder().service("gopher").build();

    let err = encoder.encode_record(&record).unwrap_err();
    assert!(err.is_schema_error());
    match err {
        IdsError::UnknownCategory { column, level } => {
            assert_eq!(column, "service");
            assert_eq!(level, "gopher");
        }
        other => panic!("Expected UnknownCategory, got {:?}", other),
    }
}

#[test]
fn test_training_only_scope_uses_unknown_bucket() {
    let encoder = FeatureEncoder::fit(&sample_records(), VocabularyScope::TrainingOnly).unwrap();
    let unknown = encoder.schema().index_of("service_unknown").unwrap();

    let record = ConnectionRecord::builder().service("gopher").build();
    let encoded = encoder.encode_record(&record).unwrap();
    assert_eq!(encoded.len(), encoder.width());
    assert_eq!(encoded[unknown], 1.0);

    let known = encoder.encode_record(&sample_records()[0]).unwrap();
    assert_eq!(known[unknown], 0.0);
}

#[test]
fn test_wrong_numeric_width_rejected() {
    let encoder = FeatureEncoder::fit(&sample_records(), VocabularyScope::FullDataset).unwrap();
    let mut record = sample_records().remove(0);
    record.numeric.pop();
    assert!(matches!(
        encoder.encode_record(&record),
        Err(IdsError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_encoder_rejects_empty_fit() {
    assert!(matches!(
        FeatureEncoder::fit(&[], VocabularyScope::FullDataset),
        Err(IdsError::EmptyDataset(_))
    ));
}

// ============================================================================
// SCHEMA
// ============================================================================

#[test]
fn test_schema_hash_detects_changes() {
    let a = FeatureSchema::new(vec!["x".into(), "y".into()]);
    let b = FeatureSchema::new(vec!["y".into(), "x".into()]);
    assert_ne!(a.hash, b.hash);
    assert!(a.validate().is_ok());
    assert!(a.ensure_compatible(&b).is_err());

    let mut tampered = a.clone();
    tampered.columns.push("z".into());
    assert!(matches!(tampered.validate(), Err(IdsError::LayoutMismatch { .. })));
}

// ============================================================================
// SCALER
// ============================================================================

#[test]
fn test_robust_scaling_formula() {
    let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];
    let mut scaler = RobustScaler::new();
    let scaled = scaler.fit_transform(&data).unwrap();

    // median 3, IQR 4 - 2 = 2
    assert_eq!(scaler.center()[0], 3.0);
    assert_eq!(scaler.scale()[0], 2.0);
    assert!((scaled[[4, 0]] - 1.0).abs() < 1e-12);
    assert!((scaled[[0, 1]] + 1.0).abs() < 1e-12);
}

#[test]
fn test_quantile_interpolates() {
    let sorted = [1.0, 2.0, 3.0, 4.0];
    assert!((scaler::quantile(&sorted, 0.25) - 1.75).abs() < 1e-12);
    assert!((scaler::quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
}

#[test]
fn test_zero_iqr_column_is_safe() {
    let data = array![[7.0, 1.0], [7.0, 2.0], [7.0, 3.0]];
    let mut scaler = RobustScaler::new();
    let scaled = scaler.fit_transform(&data).unwrap();

    assert_eq!(scaler.degenerate_columns(), &[0]);
    assert_eq!(scaler.scale()[0], 1.0);
    assert!(scaled.iter().all(|v| v.is_finite()));
    assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_scaler_lifecycle_errors() {
    let data = array![[1.0], [2.0], [3.0]];
    let scaler = RobustScaler::new();
    assert!(matches!(scaler.transform(&data), Err(IdsError::ScalerNotFitted)));

    let mut scaler = RobustScaler::new();
    scaler.fit(&data).unwrap();
    assert!(matches!(scaler.fit(&data), Err(IdsError::ScalerAlreadyFitted)));

    let wide = Array2::zeros((2, 2));
    assert!(matches!(scaler.transform(&wide), Err(IdsError::SchemaMismatch { .. })));
}

#[test]
fn test_scaling_twice_is_not_idempotent() {
    let data = array![[0.0], [10.0], [20.0], [30.0], [40.0]];
    let mut scaler = RobustScaler::new();
    let once = scaler.fit_transform(&data).unwrap();
    let twice = scaler.transform(&once).unwrap();
    assert_ne!(once, twice);
}

// ============================================================================
// SEQUENCE
// ============================================================================

#[test]
fn test_reshape_to_sequence() {
    let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let reshaper = SequenceReshaper::new(3);
    let seq = reshaper.reshape(&data).unwrap();
    assert_eq!(seq.dim(), (2, 3, 1));
    assert_eq!(seq[[1, 2, 0]], 6.0);

    assert!(matches!(
        SequenceReshaper::new(4).reshape(&data),
        Err(IdsError::SchemaMismatch { expected: 4, actual: 3 })
    ));
    assert_eq!(reshaper.reshape_row(&[1.0, 2.0, 3.0]).unwrap().dim(), (1, 3, 1));
}
