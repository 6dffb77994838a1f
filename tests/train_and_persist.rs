//! End-to-end pipeline tests: CSV -> stratified fold -> fit -> persist -> reload.

use std::io::Write;

use tabmlp::{Dataset, FitConfig, Network};

/// Two linearly separable clusters on the unit square, written as a CSV file
/// with a header row and a trailing label column.
fn write_cluster_csv(file: &mut impl Write) {
    writeln!(file, "x,y,label").unwrap();
    for i in 0..50 {
        let dx = (i % 10) as f32 * 0.015;
        let dy = (i / 10) as f32 * 0.015;
        writeln!(file, "{},{},female", 0.12 + dx, 0.18 + dy).unwrap();
        writeln!(file, "{},{},male", 0.78 + dx, 0.72 + dy).unwrap();
    }
}

fn load_folded_dataset(dir: &std::path::Path) -> (Dataset, Dataset) {
    let csv_path = dir.join("voice.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    write_cluster_csv(&mut file);
    file.flush().unwrap();

    let dataset = Dataset::from_csv(&csv_path, "label").unwrap();
    assert_eq!(dataset.len(), 100);
    assert_eq!(dataset.input_dim(), 2);
    assert_eq!(dataset.n_classes(), 2);

    let folds = dataset.stratified_kfold(5).unwrap();
    let fold = folds.last().unwrap();
    (
        dataset.subset(&fold.train).unwrap(),
        dataset.subset(&fold.val).unwrap(),
    )
}

#[test]
fn full_pipeline_trains_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (train, val) = load_folded_dataset(dir.path());
    assert_eq!(train.len(), 80);
    assert_eq!(val.len(), 20);

    let model_dir = dir.path().join("model");
    let mut net = Network::new_with_seed(&[2, 4, 2], 1).unwrap();
    let cfg = FitConfig {
        learning_rate: 0.05,
        batch_size: 32,
        n_iterations: 1000,
        eval_every: 100,
        seed: 1,
        model_dir: Some(model_dir.clone()),
    };
    let report = net.fit(&train, &val, &cfg).unwrap();

    assert_eq!(report.history.len(), 10);
    let train_acc = net.evaluate(train.inputs(), train.targets());
    assert!(
        train_acc >= 95.0,
        "expected >= 95% training accuracy, got {train_acc}"
    );

    // fit persisted the final model.
    assert!(model_dir.join("model.json").is_file());

    tabmlp::report::write_history_csv(&report.history, model_dir.join("history.csv")).unwrap();
    assert!(model_dir.join("history.csv").is_file());
}

#[test]
fn save_then_load_reproduces_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let (train, val) = load_folded_dataset(dir.path());

    let mut net = Network::new_with_seed(&[2, 6, 2], 7).unwrap();
    let cfg = FitConfig {
        n_iterations: 200,
        batch_size: 16,
        model_dir: None,
        ..FitConfig::default()
    };
    net.fit(&train, &val, &cfg).unwrap();

    let model_dir = dir.path().join("saved");
    net.save(&model_dir, &tabmlp::History::new()).unwrap();
    let loaded = Network::load(Some(&model_dir)).unwrap();

    assert_eq!(loaded.layer_sizes(), net.layer_sizes());

    let before = net.predict(val.inputs());
    let after = loaded.predict(val.inputs());
    assert_eq!(before.as_slice(), after.as_slice());
}

#[test]
fn loading_a_model_against_the_wrong_shape_fails() {
    let dir = tempfile::tempdir().unwrap();

    let net = Network::new_with_seed(&[3, 4, 2], 0).unwrap();
    let model_dir = dir.path().join("saved");
    net.save(&model_dir, &tabmlp::History::new()).unwrap();

    // Corrupt the file so layer dims no longer chain.
    let path = model_dir.join("model.json");
    let json = std::fs::read_to_string(&path).unwrap();
    let tampered = json.replacen("\"in_dim\": 3", "\"in_dim\": 5", 1);
    assert_ne!(json, tampered);
    std::fs::write(&path, tampered).unwrap();

    assert!(Network::load(Some(&model_dir)).is_err());
}
