//! Dataset loading and preprocessing.
//!
//! The pipeline mirrors the classic tabular-classification recipe: read a
//! delimited file with one label column and N numeric feature columns, map
//! label values to contiguous class ids, scale every feature column to
//! [0, 1] with min-max normalization, one-hot encode the labels, and split
//! with stratified k-fold for train/validation partitions.

use std::path::Path;

use crate::{Error, Matrix, Result};

/// A supervised classification dataset.
///
/// `inputs` is row-major `(len, input_dim)` with features already scaled;
/// `targets` is row-major `(len, classes)` one-hot.
#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Matrix,
    targets: Matrix,
    classes: Vec<String>,
}

/// Train/validation index sets for one cross-validation fold.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
}

/// Per-column min-max feature scaler.
///
/// `transform` maps each column's observed min to 0 and max to 1. Constant
/// columns map to 0 (the range guard avoids dividing by zero).
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl MinMaxScaler {
    /// Record per-column minima and maxima over `data`.
    pub fn fit(data: &Matrix) -> Result<Self> {
        if data.rows() == 0 {
            return Err(Error::InvalidData(
                "cannot fit a scaler on an empty matrix".to_owned(),
            ));
        }

        let mut mins = vec![f32::INFINITY; data.cols()];
        let mut maxs = vec![f32::NEG_INFINITY; data.cols()];
        for r in 0..data.rows() {
            for (c, &v) in data.row(r).iter().enumerate() {
                mins[c] = mins[c].min(v);
                maxs[c] = maxs[c].max(v);
            }
        }

        Ok(Self { mins, maxs })
    }

    /// Scale every column of `data` into [0, 1] in place.
    pub fn transform(&self, data: &mut Matrix) {
        assert_eq!(
            data.cols(),
            self.mins.len(),
            "matrix has {} columns, scaler was fit on {}",
            data.cols(),
            self.mins.len()
        );

        for r in 0..data.rows() {
            let row = data.row_mut(r);
            for (c, v) in row.iter_mut().enumerate() {
                let range = self.maxs[c] - self.mins[c];
                *v = if range > 0.0 {
                    (*v - self.mins[c]) / range
                } else {
                    0.0
                };
            }
        }
    }
}

/// One-hot encode class ids into a row-major `(len, n_classes)` matrix.
pub fn one_hot(class_ids: &[usize], n_classes: usize) -> Result<Matrix> {
    if n_classes == 0 {
        return Err(Error::InvalidData("n_classes must be > 0".to_owned()));
    }

    let mut out = Matrix::zeros(class_ids.len(), n_classes);
    for (r, &class) in class_ids.iter().enumerate() {
        if class >= n_classes {
            return Err(Error::InvalidData(format!(
                "class id {class} out of range for {n_classes} classes"
            )));
        }
        out[(r, class)] = 1.0;
    }
    Ok(out)
}

/// Stratified k-fold partitioning.
///
/// Samples of each class are dealt round-robin (in dataset order) across the
/// k folds, so every fold's validation set preserves the class proportions
/// of the whole. Deterministic: no shuffling.
pub fn stratified_kfold(class_ids: &[usize], k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(Error::InvalidConfig(format!("k must be >= 2, got {k}")));
    }
    if class_ids.is_empty() {
        return Err(Error::InvalidData("cannot split an empty dataset".to_owned()));
    }

    let n_classes = class_ids.iter().max().unwrap() + 1;
    let mut counts = vec![0_usize; n_classes];
    for &c in class_ids {
        counts[c] += 1;
    }
    for (class, &count) in counts.iter().enumerate() {
        if count > 0 && count < k {
            return Err(Error::InvalidData(format!(
                "class {class} has {count} members, fewer than k={k} folds"
            )));
        }
    }

    // fold_of[i] = which fold sample i validates in.
    let mut fold_of = vec![0_usize; class_ids.len()];
    let mut next_fold = vec![0_usize; n_classes];
    for (i, &c) in class_ids.iter().enumerate() {
        fold_of[i] = next_fold[c];
        next_fold[c] = (next_fold[c] + 1) % k;
    }

    let mut folds = Vec::with_capacity(k);
    for f in 0..k {
        let mut train = Vec::new();
        let mut val = Vec::new();
        for (i, &assigned) in fold_of.iter().enumerate() {
            if assigned == f {
                val.push(i);
            } else {
                train.push(i);
            }
        }
        folds.push(Fold { train, val });
    }
    Ok(folds)
}

impl Dataset {
    /// Build a dataset from already-prepared matrices.
    pub fn from_parts(inputs: Matrix, targets: Matrix, classes: Vec<String>) -> Result<Self> {
        if inputs.rows() != targets.rows() {
            return Err(Error::InvalidShape(format!(
                "inputs have {} rows, targets have {}",
                inputs.rows(),
                targets.rows()
            )));
        }
        if targets.cols() != classes.len() {
            return Err(Error::InvalidShape(format!(
                "targets have {} columns, but {} class names were given",
                targets.cols(),
                classes.len()
            )));
        }

        Ok(Self {
            inputs,
            targets,
            classes,
        })
    }

    /// Load a delimited text file with a header row, one label column and
    /// numeric feature columns.
    ///
    /// Label values are mapped to class ids in order of first appearance;
    /// features are min-max scaled to [0, 1] per column over the whole file
    /// before any splitting.
    pub fn from_csv<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let p = path.as_ref();
        let mut reader = csv::Reader::from_path(p)
            .map_err(|e| Error::InvalidData(format!("failed to open {}: {e}", p.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| Error::InvalidData(format!("failed to read header of {}: {e}", p.display())))?
            .clone();
        let label_idx = headers
            .iter()
            .position(|h| h == label_column)
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "label column {label_column:?} not found in {}",
                    p.display()
                ))
            })?;

        let n_features = headers.len().saturating_sub(1);
        if n_features == 0 {
            return Err(Error::InvalidData(format!(
                "{} has no feature columns",
                p.display()
            )));
        }

        let mut features = Vec::new();
        let mut classes: Vec<String> = Vec::new();
        let mut class_ids = Vec::new();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                Error::InvalidData(format!("failed to read row {row_idx} of {}: {e}", p.display()))
            })?;

            for (col, field) in record.iter().enumerate() {
                if col == label_idx {
                    let class = match classes.iter().position(|c| c == field) {
                        Some(id) => id,
                        None => {
                            classes.push(field.to_owned());
                            classes.len() - 1
                        }
                    };
                    class_ids.push(class);
                } else {
                    let v: f32 = field.trim().parse().map_err(|e| {
                        Error::InvalidData(format!(
                            "row {row_idx}, column {:?}: not a number ({e})",
                            &headers[col]
                        ))
                    })?;
                    features.push(v);
                }
            }
        }

        if class_ids.is_empty() {
            return Err(Error::InvalidData(format!("{} has no data rows", p.display())));
        }

        let mut inputs = Matrix::from_vec(class_ids.len(), n_features, features)?;
        let scaler = MinMaxScaler::fit(&inputs)?;
        scaler.transform(&mut inputs);

        let targets = one_hot(&class_ids, classes.len())?;
        Self::from_parts(inputs, targets, classes)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.inputs.cols()
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.targets.cols()
    }

    #[inline]
    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    #[inline]
    pub fn targets(&self) -> &Matrix {
        &self.targets
    }

    /// Class names in class-id order.
    #[inline]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[inline]
    pub fn input_row(&self, idx: usize) -> &[f32] {
        self.inputs.row(idx)
    }

    #[inline]
    pub fn target_row(&self, idx: usize) -> &[f32] {
        self.targets.row(idx)
    }

    /// Class id of sample `idx` (argmax of its one-hot row).
    pub fn class_of(&self, idx: usize) -> usize {
        let row = self.targets.row(idx);
        let mut best = 0;
        for (c, &v) in row.iter().enumerate() {
            if v > row[best] {
                best = c;
            }
        }
        best
    }

    /// A new dataset containing the given rows, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::InvalidData("subset must not be empty".to_owned()));
        }

        let mut inputs = Matrix::zeros(indices.len(), self.input_dim());
        let mut targets = Matrix::zeros(indices.len(), self.n_classes());
        for (r, &idx) in indices.iter().enumerate() {
            if idx >= self.len() {
                return Err(Error::InvalidData(format!(
                    "subset index {idx} out of range for {} samples",
                    self.len()
                )));
            }
            inputs.row_mut(r).copy_from_slice(self.input_row(idx));
            targets.row_mut(r).copy_from_slice(self.target_row(idx));
        }

        Self::from_parts(inputs, targets, self.classes.clone())
    }

    /// Stratified k-fold over this dataset's class labels.
    pub fn stratified_kfold(&self, k: usize) -> Result<Vec<Fold>> {
        let class_ids: Vec<usize> = (0..self.len()).map(|i| self.class_of(i)).collect();
        stratified_kfold(&class_ids, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn min_max_scaling_maps_extremes_to_unit_interval() {
        let mut m = Matrix::from_rows(&[
            vec![10.0, -1.0],
            vec![20.0, 0.0],
            vec![15.0, 3.0],
        ])
        .unwrap();
        let scaler = MinMaxScaler::fit(&m).unwrap();
        scaler.transform(&mut m);

        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(1, 0)], 1.0);
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(2, 1)], 1.0);
        for r in 0..3 {
            for c in 0..2 {
                assert!((0.0..=1.0).contains(&m[(r, c)]), "({r},{c}) = {}", m[(r, c)]);
            }
        }
    }

    #[test]
    fn constant_columns_scale_to_zero() {
        let mut m = Matrix::from_rows(&[vec![5.0], vec![5.0]]).unwrap();
        let scaler = MinMaxScaler::fit(&m).unwrap();
        scaler.transform(&mut m);
        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(1, 0)], 0.0);
    }

    #[test]
    fn one_hot_sets_exactly_one_entry_per_row() {
        let m = one_hot(&[1, 0, 2], 3).unwrap();
        assert_eq!(m.row(0), &[0.0, 1.0, 0.0]);
        assert_eq!(m.row(1), &[1.0, 0.0, 0.0]);
        assert_eq!(m.row(2), &[0.0, 0.0, 1.0]);

        assert!(one_hot(&[3], 3).is_err());
    }

    #[test]
    fn stratified_folds_preserve_class_balance() {
        // 10 of class 0, 10 of class 1.
        let labels: Vec<usize> = (0..20).map(|i| i % 2).collect();
        let folds = stratified_kfold(&labels, 5).unwrap();

        assert_eq!(folds.len(), 5);
        for fold in &folds {
            assert_eq!(fold.val.len(), 4);
            assert_eq!(fold.train.len(), 16);

            let val_class_1 = fold.val.iter().filter(|&&i| labels[i] == 1).count();
            assert_eq!(val_class_1, 2);

            // No overlap between train and val.
            for i in &fold.val {
                assert!(!fold.train.contains(i));
            }
        }
    }

    #[test]
    fn stratified_kfold_rejects_tiny_classes() {
        let labels = vec![0, 0, 0, 1];
        assert!(stratified_kfold(&labels, 3).is_err());
    }

    #[test]
    fn from_csv_maps_labels_and_scales_features() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "f1,label,f2").unwrap();
        writeln!(file, "0.0,male,10.0").unwrap();
        writeln!(file, "2.0,female,30.0").unwrap();
        writeln!(file, "4.0,male,20.0").unwrap();
        file.flush().unwrap();

        let ds = Dataset::from_csv(file.path(), "label").unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.input_dim(), 2);
        assert_eq!(ds.n_classes(), 2);
        assert_eq!(ds.classes(), &["male".to_owned(), "female".to_owned()]);

        // Feature columns are min-max scaled.
        assert_eq!(ds.input_row(0), &[0.0, 0.0]);
        assert_eq!(ds.input_row(1), &[0.5, 1.0]);
        assert_eq!(ds.input_row(2), &[1.0, 0.5]);

        // Labels one-hot by first appearance: male = 0, female = 1.
        assert_eq!(ds.target_row(0), &[1.0, 0.0]);
        assert_eq!(ds.target_row(1), &[0.0, 1.0]);
        assert_eq!(ds.class_of(1), 1);
    }

    #[test]
    fn from_csv_rejects_missing_label_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2").unwrap();
        file.flush().unwrap();

        assert!(Dataset::from_csv(file.path(), "label").is_err());
    }

    #[test]
    fn from_csv_rejects_non_numeric_features() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,label").unwrap();
        writeln!(file, "oops,male").unwrap();
        file.flush().unwrap();

        assert!(Dataset::from_csv(file.path(), "label").is_err());
    }

    #[test]
    fn subset_selects_rows_in_order() {
        let inputs = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let targets = one_hot(&[0, 1, 0], 2).unwrap();
        let ds = Dataset::from_parts(inputs, targets, vec!["a".into(), "b".into()]).unwrap();

        let sub = ds.subset(&[2, 0]).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.input_row(0), &[3.0]);
        assert_eq!(sub.input_row(1), &[1.0]);
        assert!(ds.subset(&[5]).is_err());
    }
}
