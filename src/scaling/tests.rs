//! Tests for the scaling pipeline

use super::*;
use crate::error::ForecastError;
use crate::types::Observation;
use chrono::NaiveDate;

fn history(len: usize) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    (0..len)
        .map(|i| {
            let close = 100.0 + i as f64;
            Observation {
                id: i as i64,
                date: start + chrono::Duration::days(i as i64),
                trading_code: "GP".to_string(),
                ltp: close,
                high: close + 2.0,
                low: close - 2.0,
                openp: close - 1.0,
                closep: close,
                ycp: close - 1.0,
                trade: 10,
                value: 1.0,
                volume: 1000 + i as i64,
            }
        })
        .collect()
}

fn close_scaler() -> FittedScaler {
    FittedScaler::min_max(&[100.0], &[200.0]).unwrap()
}

fn ohlcv_scaler() -> FittedScaler {
    FittedScaler::min_max(&[90.0, 95.0, 85.0, 100.0, 0.0], &[210.0, 215.0, 205.0, 200.0, 5000.0])
        .unwrap()
}

#[test]
fn test_encode_close_window_shape() {
    let h = history(80);
    let window = encode(&h, &close_scaler(), FeatureLayout::Close, 60).unwrap();
    assert_eq!(window.shape(), &[1, 60, 1]);
    // last 60 of closes 100..179 start at 120
    assert!((window[[0, 0, 0]] - 0.20).abs() < 1e-12);
    assert!((window[[0, 59, 0]] - 0.79).abs() < 1e-12);
}

#[test]
fn test_encode_ohlcv_columns() {
    let h = history(60);
    let window = encode(&h, &ohlcv_scaler(), FeatureLayout::Ohlcv, 60).unwrap();
    assert_eq!(window.shape(), &[1, 60, 5]);
    // close column of the first row: (100 - 100) / 100
    assert!((window[[0, 0, 3]] - 0.0).abs() < 1e-12);
    // volume column of the last row: 1059 / 5000
    assert!((window[[0, 59, 4]] - 1059.0 / 5000.0).abs() < 1e-12);
}

#[test]
fn test_encode_requires_full_window() {
    let short = history(59);
    let err = encode(&short, &close_scaler(), FeatureLayout::Close, 60).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientHistory { required: 60, actual: 59 }
    ));

    let exact = history(60);
    assert!(encode(&exact, &close_scaler(), FeatureLayout::Close, 60).is_ok());
}

#[test]
fn test_encode_rejects_layout_mismatch() {
    let h = history(60);
    let err = encode(&h, &close_scaler(), FeatureLayout::Ohlcv, 60).unwrap_err();
    assert!(matches!(err, ForecastError::Shape(_)));
}

#[test]
fn test_decode_close_round_trip() {
    let scaler = close_scaler();
    let prices = [123.45, 150.0, 199.99];
    let rows = Array2::from_shape_vec((3, 1), prices.to_vec()).unwrap();
    let scaled = scaler.transform(&rows).unwrap();
    let scaled: Vec<f64> = scaled.column(0).to_vec();

    let decoded = decode(&scaled, &scaler, FeatureLayout::Close).unwrap();
    for (got, want) in decoded.iter().zip(prices) {
        assert!((got - want).abs() < 1e-9);
    }
}

#[test]
fn test_decode_ohlcv_uses_close_column() {
    let scaler = ohlcv_scaler();
    let rows = Array2::from_shape_vec(
        (2, 5),
        vec![
            120.0, 125.0, 115.0, 142.5, 3000.0, //
            130.0, 135.0, 125.0, 188.0, 1500.0,
        ],
    )
    .unwrap();
    let scaled = scaler.transform(&rows).unwrap();
    let target: Vec<f64> = scaled.column(3).to_vec();

    let decoded = decode(&target, &scaler, FeatureLayout::Ohlcv).unwrap();
    assert!((decoded[0] - 142.5).abs() < 1e-9);
    assert!((decoded[1] - 188.0).abs() < 1e-9);
}

#[test]
fn test_decode_floors_negative_prices() {
    let scaler = FittedScaler::Standard { mean: vec![0.0], scale: vec![10.0] };
    let decoded = decode(&[-3.0, 2.0], &scaler, FeatureLayout::Close).unwrap();
    assert_eq!(decoded[0], 0.0);
    assert!((decoded[1] - 20.0).abs() < 1e-12);
}

#[test]
fn test_decode_empty() {
    let decoded = decode(&[], &close_scaler(), FeatureLayout::Close).unwrap();
    assert!(decoded.is_empty());
}

#[test]
fn test_standard_scaler_round_trip() {
    let scaler = FittedScaler::Standard {
        mean: vec![10.0, 20.0],
        scale: vec![2.0, 4.0],
    };
    let rows = Array2::from_shape_vec((1, 2), vec![14.0, 12.0]).unwrap();
    let scaled = scaler.transform(&rows).unwrap();
    assert_eq!(scaled[[0, 0]], 2.0);
    assert_eq!(scaled[[0, 1]], -2.0);
    let back = scaler.inverse_transform(&scaled).unwrap();
    assert_eq!(back, rows);
}

#[test]
fn test_scaler_from_json() {
    let json = br#"{"kind": "min_max", "scale_": [0.01], "min_": [-1.0]}"#;
    let scaler = FittedScaler::from_json(json).unwrap();
    assert_eq!(scaler.n_features(), 1);
    assert_eq!(scaler, close_scaler());

    let json = br#"{"kind": "standard", "mean": [1.0, 2.0], "scale": [1.0, 1.0]}"#;
    assert_eq!(FittedScaler::from_json(json).unwrap().n_features(), 2);
}

#[test]
fn test_scaler_from_json_rejects_bad_params() {
    let mismatched = br#"{"kind": "min_max", "scale_": [0.01, 0.02], "min_": [-1.0]}"#;
    assert!(FittedScaler::from_json(mismatched).is_err());

    let zero_scale = br#"{"kind": "standard", "mean_": [1.0], "scale_": [0.0]}"#;
    assert!(FittedScaler::from_json(zero_scale).is_err());

    assert!(FittedScaler::from_json(b"not json").is_err());
}

#[test]
fn test_transform_rejects_wrong_width() {
    let rows = Array2::<f64>::zeros((2, 3));
    assert!(close_scaler().transform(&rows).is_err());
    assert!(close_scaler().inverse_transform(&rows).is_err());
}

#[test]
fn test_floor_price() {
    assert_eq!(floor_price(-1.0), 0.0);
    assert_eq!(floor_price(3.5), 3.5);
    assert_eq!(floor_price(f64::NAN), 0.0);
}
