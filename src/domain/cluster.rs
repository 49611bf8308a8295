//! Fitted clustering parameters: feature scaler and k-means centroids.

use serde::{Deserialize, Serialize};

use super::{DistrictProfile, FeatureVector, FEATURE_COUNT};

/// Per-feature standardization fitted on one district batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: FeatureVector,
    /// Population standard deviation; 1.0 for constant features
    pub scale: FeatureVector,
}

impl StandardScaler {
    /// Fit mean and scale over the given rows. An empty batch yields the
    /// identity transform.
    #[must_use]
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        let n = rows.len() as f64;
        for j in 0..FEATURE_COUNT {
            let mu = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mu).powi(2)).sum::<f64>() / n;
            mean[j] = mu;
            let sd = var.sqrt();
            scale[j] = if sd > f64::EPSILON { sd } else { 1.0 };
        }

        Self { mean, scale }
    }

    #[must_use]
    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        std::array::from_fn(|j| (row[j] - self.mean[j]) / self.scale[j])
    }
}

/// Fitted k-means centroids in scaled feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub centroids: Vec<FeatureVector>,
    /// Sum of squared distances of rows to their centroid
    pub inertia: f64,
    /// Lloyd iterations of the winning restart
    pub iterations: usize,
}

impl KMeansModel {
    #[must_use]
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Nearest centroid; ties go to the lower id.
    #[must_use]
    pub fn nearest(&self, point: &FeatureVector) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (id, centroid) in self.centroids.iter().enumerate() {
            let d = squared_distance(point, centroid);
            if d < best.1 {
                best = (id, d);
            }
        }
        best
    }
}

/// Scaler and centroids together; enough to place a new district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    pub scaler: StandardScaler,
    pub kmeans: KMeansModel,
}

impl RiskModel {
    /// Cluster id for a profile under this fit.
    #[must_use]
    pub fn predict(&self, profile: &DistrictProfile) -> usize {
        let scaled = self.scaler.transform(&profile.feature_vector());
        self.kmeans.nearest(&scaled).0
    }
}

#[must_use]
pub fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(first: f64, second: f64) -> FeatureVector {
        let mut r = [0.0; FEATURE_COUNT];
        r[0] = first;
        r[1] = second;
        r
    }

    #[test]
    fn test_scaler_standardizes() {
        let rows = vec![row(1.0, 5.0), row(3.0, 5.0)];
        let scaler = StandardScaler::fit(&rows);

        assert!((scaler.mean[0] - 2.0).abs() < 1e-12);
        assert!((scaler.scale[0] - 1.0).abs() < 1e-12);
        // Constant feature keeps unit scale
        assert!((scaler.scale[1] - 1.0).abs() < 1e-12);

        let t = scaler.transform(&rows[0]);
        assert!((t[0] + 1.0).abs() < 1e-12);
        assert_eq!(t[1], 0.0);
    }

    #[test]
    fn test_scaler_unit_variance() {
        let rows: Vec<_> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|&v| row(v, 0.0))
            .collect();
        let scaler = StandardScaler::fit(&rows);
        assert!((scaler.scale[0] - 2.0).abs() < 1e-12);

        let scaled: Vec<f64> = rows.iter().map(|r| scaler.transform(r)[0]).collect();
        let mean = scaled.iter().sum::<f64>() / scaled.len() as f64;
        let var = scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / scaled.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_prefers_lower_id_on_tie() {
        let model = KMeansModel {
            centroids: vec![row(-1.0, 0.0), row(1.0, 0.0)],
            inertia: 0.0,
            iterations: 1,
        };
        assert_eq!(model.nearest(&row(0.0, 0.0)).0, 0);
        assert_eq!(model.nearest(&row(0.9, 0.0)).0, 1);
    }
}
