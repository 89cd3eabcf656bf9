//! End-to-end tests for preprocessing, training and inference

mod common;

use churnscope::pipeline::{
    evaluate_accuracy, feature_columns, fit_pipeline, fit_transform, parse_csv_bytes, predict,
    predict_records, records_to_dataframe, transform, RiskLevel,
};
use churnscope::ChurnError;
use common::{fast_trainer, small_dataframe, telco_dataframe};
use serde_json::{json, Map, Value};

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

#[test]
fn test_feature_columns_exclude_identifier_and_outcome() {
    let names = feature_columns(&telco_dataframe(12));
    assert!(!names.iter().any(|n| n == "customerID"));
    assert!(!names.iter().any(|n| n == "Churn"));
    assert_eq!(names.len(), 14);
}

#[test]
fn test_fit_transform_registers_every_feature() {
    let (table, registry) = fit_transform(&telco_dataframe(30)).unwrap();

    assert_eq!(table.n_rows(), 30);
    assert!(registry.encoder("Contract").is_some());
    assert!(registry.encoder("gender").is_some());
    assert!(registry.mean("tenure").is_some());
    assert!(registry.mean("TotalCharges").is_some());
    assert!(registry.encoder("SeniorCitizen").is_none());
}

#[test]
fn test_encoding_is_deterministic_across_calls() {
    let df = telco_dataframe(45);
    let (fitted, registry) = fit_transform(&df).unwrap();
    let again = transform(&df, &registry).unwrap();
    assert_eq!(fitted.values(), again.values());
}

#[test]
fn test_pipeline_learns_contract_tenure_rule() {
    let df = telco_dataframe(240);
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();

    let accuracy = evaluate_accuracy(&df, &pipeline).unwrap();
    assert!(
        (90.0..=100.0).contains(&accuracy),
        "accuracy {} too low",
        accuracy
    );

    let importances = pipeline.model.feature_importances();
    let total: f64 = importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-9);
    let share = |name: &str| {
        importances
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .unwrap()
    };
    assert!(share("Contract") > 0.1);
    assert!(share("Contract") > share("gender"));
}

#[test]
fn test_same_seed_gives_same_probabilities() {
    let df = telco_dataframe(90);
    let first = fit_pipeline(&df, &fast_trainer()).unwrap();
    let second = fit_pipeline(&df, &fast_trainer()).unwrap();

    let a: Vec<f64> = predict(&df, &first).unwrap().iter().map(|p| p.probability).collect();
    let b: Vec<f64> = predict(&df, &second).unwrap().iter().map(|p| p.probability).collect();
    assert_eq!(a, b);
}

#[test]
fn test_missing_features_equal_explicit_zeros() {
    let df = telco_dataframe(90);
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();
    let zero_contract = pipeline.registry.encoder("Contract").unwrap().classes()[0].clone();

    let partial = record(json!({ "tenure": 5.0, "MonthlyCharges": 80.0 }));
    let mut explicit = partial.clone();
    for name in pipeline.model.feature_names() {
        if explicit.contains_key(name) {
            continue;
        }
        let value = match pipeline.registry.encoder(name) {
            Some(encoder) => Value::from(encoder.decode(0).unwrap()),
            None => Value::from(0.0),
        };
        explicit.insert(name.clone(), value);
    }
    assert_eq!(explicit["Contract"], Value::from(zero_contract));

    let a = predict_records(&[partial], &pipeline).unwrap();
    let b = predict_records(&[explicit], &pipeline).unwrap();
    assert_eq!(a[0].probability, b[0].probability);
}

#[test]
fn test_empty_record_scores_as_all_zero_row() {
    let df = telco_dataframe(90);
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();

    let mut explicit = Map::new();
    for name in pipeline.model.feature_names() {
        let value = match pipeline.registry.encoder(name) {
            Some(encoder) => Value::from(encoder.decode(0).unwrap()),
            None => Value::from(0.0),
        };
        explicit.insert(name.clone(), value);
    }

    let empty = predict_records(&[Map::new()], &pipeline).unwrap();
    let zeros = predict_records(&[explicit], &pipeline).unwrap();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].probability, zeros[0].probability);

    let batch = predict_records(&[Map::new(), Map::new(), Map::new()], &pipeline).unwrap();
    assert_eq!(batch.len(), 3);
}

#[test]
fn test_numeric_json_matches_text_category() {
    let csv = "customerID,Plan,tenure,Churn\n\
1,1.0,3,Yes\n\
2,premium,40,No\n\
3,1.0,5,Yes\n\
4,premium,50,No\n";
    let df = parse_csv_bytes(csv.as_bytes(), 100).unwrap();
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();
    assert!(pipeline.registry.encoder("Plan").is_some());

    let numeric = predict_records(&[record(json!({ "Plan": 1, "tenure": 4 }))], &pipeline).unwrap();
    let text = predict_records(&[record(json!({ "Plan": "1.0", "tenure": 4 }))], &pipeline).unwrap();
    assert_eq!(numeric[0].probability, text[0].probability);
}

#[test]
fn test_extra_columns_are_ignored() {
    let df = telco_dataframe(60);
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();

    let base = record(json!({ "tenure": 3.0, "Contract": "Month-to-month" }));
    let mut extra = base.clone();
    extra.insert("loyaltyScore".to_string(), Value::from(9.5));

    let a = predict_records(&[base], &pipeline).unwrap();
    let b = predict_records(&[extra], &pipeline).unwrap();
    assert_eq!(a[0].probability, b[0].probability);
}

#[test]
fn test_unseen_category_is_rejected() {
    let pipeline = fit_pipeline(&telco_dataframe(60), &fast_trainer()).unwrap();
    let err = predict_records(
        &[record(json!({ "Contract": "Three year", "tenure": 10 }))],
        &pipeline,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ChurnError::UnseenCategory { ref column, ref value }
            if column == "Contract" && value == "Three year"
    ));
}

#[test]
fn test_prediction_fields_are_consistent() {
    let df = telco_dataframe(90);
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();

    for p in predict(&df, &pipeline).unwrap() {
        assert!((0.0..=1.0).contains(&p.probability));
        assert_eq!(p.churn, p.probability > 0.5);
        assert_eq!(p.risk, RiskLevel::from_probability(p.probability));
    }
}

#[test]
fn test_rows_with_unknown_outcome_are_skipped() {
    let mut csv = common::telco_csv(60);
    csv.push_str(
        "X9999,Male,0,Yes,No,4,Yes,DSL,No,No,No,No,Month-to-month,50.00,200.00,Maybe\n",
    );
    let df = parse_csv_bytes(csv.as_bytes(), 10_000).unwrap();
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();

    let accuracy = evaluate_accuracy(&df, &pipeline).unwrap();
    assert!((0.0..=100.0).contains(&accuracy));
}

#[test]
fn test_training_requires_labels() {
    let df = records_to_dataframe(&[record(json!({ "tenure": 1, "Churn": "Unknown" }))]).unwrap();
    assert!(matches!(
        fit_pipeline(&df, &fast_trainer()),
        Err(ChurnError::EmptyLabels)
    ));
}

#[test]
fn test_small_dataset_trains() {
    let df = small_dataframe();
    let pipeline = fit_pipeline(&df, &fast_trainer()).unwrap();
    assert_eq!(
        pipeline.model.feature_names(),
        &["gender", "Contract", "MonthlyCharges"]
    );
}
