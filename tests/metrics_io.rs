//! Integration tests for the metrics TSV reader.

use spikecurate::io::{read_metrics_tsv, read_metrics_tsv_with_config, MetricsReaderConfig};

#[test]
fn reads_a_metrics_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.tsv");
    std::fs::write(
        &path,
        "unit_id\tsnr\thalf_width\n7\t8.1\t0.62\n3\t1.1\t0.12\n",
    )
    .unwrap();

    let table = read_metrics_tsv(&path).unwrap();
    assert_eq!(table.unit_ids(), &[7, 3]);
    assert_eq!(table.n_metrics(), 2);
    assert_eq!(
        table.columns(),
        &["snr".to_string(), "half_width".to_string()]
    );
    assert!((table.values()[(0, 0)] - 8.1).abs() < 1e-9);
    assert!((table.values()[(1, 1)] - 0.12).abs() < 1e-9);
}

#[test]
fn empty_fields_become_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.tsv");
    std::fs::write(&path, "unit_id\tsnr\thalf_width\n1\t\t0.5\n").unwrap();

    let table = read_metrics_tsv(&path).unwrap();
    assert!(table.values()[(0, 0)].is_nan());
    assert!((table.values()[(0, 1)] - 0.5).abs() < 1e-9);
}

#[test]
fn header_match_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.tsv");
    std::fs::write(&path, "Unit_ID\tsnr\n1\t2.0\n").unwrap();

    let table = read_metrics_tsv(&path).unwrap();
    assert_eq!(table.unit_ids(), &[1]);
    assert_eq!(table.columns(), &["snr".to_string()]);
}

#[test]
fn missing_unit_id_column_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.tsv");
    std::fs::write(&path, "cluster\tsnr\n1\t2.0\n").unwrap();

    let err = read_metrics_tsv(&path).unwrap_err();
    assert!(err.to_string().contains("missing unit id column 'unit_id'"));
}

#[test]
fn unit_id_column_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.tsv");
    std::fs::write(&path, "cluster_id\tsnr\n4\t3.5\n").unwrap();

    let config = MetricsReaderConfig {
        unit_id_column: "cluster_id".to_string(),
    };
    let table = read_metrics_tsv_with_config(&path, &config).unwrap();
    assert_eq!(table.unit_ids(), &[4]);
}

#[test]
fn invalid_metric_value_names_row_and_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.tsv");
    std::fs::write(&path, "unit_id\tsnr\n1\tabc\n").unwrap();

    let err = read_metrics_tsv(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("invalid value for metric 'snr' at row 1"));
}

#[test]
fn nonexistent_file_errors() {
    let err = read_metrics_tsv("/nonexistent/metrics.tsv").unwrap_err();
    assert!(err.to_string().contains("failed to open metrics file"));
}
