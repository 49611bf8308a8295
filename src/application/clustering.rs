//! Risk clusterer: groups districts by standardized infrastructure and
//! risk features with seeded k-means.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::domain::{
    squared_distance, ClusterAssignment, ClusteredDistrict, DataError, DistrictProfile, FeatureVector, KMeansModel,
    RiskModel, StandardScaler, FEATURE_COUNT,
};

/// K-means parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    /// Number of clusters
    pub k: usize,
    pub seed: u64,
    /// Independent restarts; the lowest-inertia fit wins
    pub n_init: usize,
    pub max_iter: usize,
    /// Largest centroid move that still counts as converged
    pub tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

/// Result of one clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    /// Input table in input order, annotated with cluster ids
    pub districts: Vec<ClusteredDistrict>,
    pub model: RiskModel,
}

impl ClusterOutcome {
    #[must_use]
    pub fn assignments(&self) -> ClusterAssignment {
        assignments(&self.districts)
    }

    /// Number of clusters holding at least one district.
    #[must_use]
    pub fn clusters_in_use(&self) -> usize {
        self.districts
            .iter()
            .map(|d| d.risk_cluster)
            .max()
            .map_or(0, |highest| highest + 1)
    }
}

/// District name to cluster id for a clustered table.
#[must_use]
pub fn assignments(districts: &[ClusteredDistrict]) -> ClusterAssignment {
    districts
        .iter()
        .map(|d| (d.profile.name.clone(), d.risk_cluster))
        .collect()
}

/// Assigns every district to one of `k` risk clusters.
#[derive(Debug, Clone, Default)]
pub struct RiskClusterer {
    config: ClusterConfig,
}

impl RiskClusterer {
    #[must_use]
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Standardize features, fit k-means and annotate the table.
    ///
    /// Identical input and config always give identical ids. Ids are
    /// numbered by first appearance in table order.
    ///
    /// # Errors
    /// Returns `DataError` if the table is empty, `k` is zero, or there
    /// are fewer districts than clusters.
    pub fn cluster(&self, districts: &[DistrictProfile]) -> Result<ClusterOutcome, DataError> {
        let k = self.config.k;
        if districts.is_empty() {
            return Err(DataError::EmptyTable("districts"));
        }
        if k == 0 {
            return Err(DataError::InvalidClusterCount);
        }
        if districts.len() < k {
            return Err(DataError::InsufficientRows {
                rows: districts.len(),
                clusters: k,
            });
        }

        let raw: Vec<FeatureVector> = districts.iter().map(DistrictProfile::feature_vector).collect();
        let scaler = StandardScaler::fit(&raw);
        let scaled: Vec<FeatureVector> = raw.iter().map(|r| scaler.transform(r)).collect();

        let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed);
        let (mut kmeans, mut labels) = fit_once(&scaled, &self.config, &mut rng);
        for _ in 1..self.config.n_init {
            let (candidate, candidate_labels) = fit_once(&scaled, &self.config, &mut rng);
            if candidate.inertia < kmeans.inertia {
                kmeans = candidate;
                labels = candidate_labels;
            }
        }
        canonicalize(&mut kmeans, &mut labels);

        tracing::info!(
            "Clustered {} districts into {} groups (inertia {:.4}, {} iterations)",
            districts.len(),
            k,
            kmeans.inertia,
            kmeans.iterations
        );

        let districts = districts
            .iter()
            .zip(labels)
            .map(|(profile, risk_cluster)| ClusteredDistrict {
                profile: profile.clone(),
                risk_cluster,
            })
            .collect();

        let outcome = ClusterOutcome {
            districts,
            model: RiskModel { scaler, kmeans },
        };
        let in_use = outcome.clusters_in_use();
        if in_use < k {
            tracing::warn!(
                "Clustering collapsed: only {} of {} clusters hold districts (duplicate or degenerate rows)",
                in_use,
                k
            );
        }
        Ok(outcome)
    }
}

/// One k-means++ seeded Lloyd run.
fn fit_once<R: Rng>(points: &[FeatureVector], config: &ClusterConfig, rng: &mut R) -> (KMeansModel, Vec<usize>) {
    let mut model = KMeansModel {
        centroids: seed_centroids(points, config.k, rng),
        inertia: 0.0,
        iterations: 0,
    };
    let mut labels = vec![0; points.len()];

    for iteration in 1..=config.max_iter.max(1) {
        model.iterations = iteration;
        for (label, point) in labels.iter_mut().zip(points) {
            *label = model.nearest(point).0;
        }

        let mut sums = vec![[0.0; FEATURE_COUNT]; config.k];
        let mut counts = vec![0usize; config.k];
        for (&label, point) in labels.iter().zip(points) {
            counts[label] += 1;
            for (acc, v) in sums[label].iter_mut().zip(point) {
                *acc += v;
            }
        }

        let mut shift: f64 = 0.0;
        for ((centroid, sum), &count) in model.centroids.iter_mut().zip(&sums).zip(&counts) {
            // An emptied cluster keeps its previous centroid.
            if count == 0 {
                continue;
            }
            let updated: FeatureVector = std::array::from_fn(|j| sum[j] / count as f64);
            shift = shift.max(squared_distance(centroid, &updated).sqrt());
            *centroid = updated;
        }

        if shift <= config.tolerance {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, point) in labels.iter_mut().zip(points) {
        let (id, dist) = model.nearest(point);
        *label = id;
        inertia += dist;
    }
    model.inertia = inertia;

    (model, labels)
}

/// k-means++: each next seed drawn proportionally to its squared distance
/// from the nearest seed chosen so far.
fn seed_centroids<R: Rng>(points: &[FeatureVector], k: usize, rng: &mut R) -> Vec<FeatureVector> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut closest: Vec<f64> = points.iter().map(|p| squared_distance(p, &centroids[0])).collect();
    while centroids.len() < k {
        // All-zero weights: every point already sits on a seed.
        let next = match WeightedIndex::new(&closest) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.gen_range(0..points.len()),
        };
        let chosen = points[next];
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

/// Renumber clusters by first appearance in row order.
fn canonicalize(model: &mut KMeansModel, labels: &mut [usize]) {
    let k = model.centroids.len();
    let mut order: Vec<usize> = Vec::with_capacity(k);
    for &label in labels.iter() {
        if !order.contains(&label) {
            order.push(label);
        }
    }
    for id in 0..k {
        if !order.contains(&id) {
            order.push(id);
        }
    }

    let mut remap = vec![0; k];
    for (new_id, &old_id) in order.iter().enumerate() {
        remap[old_id] = new_id;
    }
    for label in labels.iter_mut() {
        *label = remap[*label];
    }
    model.centroids = order.iter().map(|&old_id| model.centroids[old_id]).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::district_csv::read_profiles;
    use crate::domain::RiskRatings;

    fn district(name: &str, water: f64, crowding: f64) -> DistrictProfile {
        let mut profile = DistrictProfile::new(
            name,
            RiskRatings {
                water: Some(water),
                sanitation: Some(water / 2.0),
                crowding: Some(crowding),
                healthcare_access: Some(3.0),
                overall: Some((water + crowding) / 2.0),
            },
        );
        profile.infrastructure.piped_water_pct = Some(100.0 - water * 10.0);
        profile
    }

    fn kerala() -> Vec<DistrictProfile> {
        vec![
            district("Alappuzha", 8.0, 7.5),
            district("Idukki", 2.0, 1.0),
            district("Kottayam", 7.8, 7.0),
            district("Wayanad", 2.2, 1.2),
            district("Kollam", 5.0, 9.0),
            district("Palakkad", 1.8, 0.8),
        ]
    }

    fn clusterer(k: usize) -> RiskClusterer {
        RiskClusterer::new(ClusterConfig {
            k,
            ..ClusterConfig::default()
        })
    }

    #[test]
    fn test_well_separated_groups() {
        let outcome = clusterer(2).cluster(&kerala()).expect("Should cluster");
        let ids = outcome.assignments();

        assert_eq!(ids["Alappuzha"], 0);
        assert_eq!(ids["Kottayam"], 0);
        assert_eq!(ids["Kollam"], 0);
        assert_eq!(ids["Idukki"], 1);
        assert_eq!(ids["Wayanad"], 1);
        assert_eq!(ids["Palakkad"], 1);
        assert_eq!(outcome.model.kmeans.k(), 2);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let config = ClusterConfig {
            k: 3,
            seed: 7,
            ..ClusterConfig::default()
        };
        let first = RiskClusterer::new(config).cluster(&kerala()).expect("Should cluster");
        let second = RiskClusterer::new(config).cluster(&kerala()).expect("Should cluster");

        assert_eq!(first.assignments(), second.assignments());
        assert_eq!(first.model, second.model);
    }

    #[test]
    fn test_ids_by_first_appearance() {
        let outcome = clusterer(4).cluster(&kerala()).expect("Should cluster");
        assert_eq!(outcome.districts[0].risk_cluster, 0);

        let mut max_seen = 0;
        for d in &outcome.districts {
            assert!(d.risk_cluster <= max_seen + 1);
            max_seen = max_seen.max(d.risk_cluster);
        }
        // Input order is preserved.
        let names: Vec<_> = outcome.districts.iter().map(|d| d.profile.name.as_str()).collect();
        assert_eq!(names, ["Alappuzha", "Idukki", "Kottayam", "Wayanad", "Kollam", "Palakkad"]);
    }

    #[test]
    fn test_model_predicts_training_assignment() {
        let table = kerala();
        let outcome = clusterer(2).cluster(&table).expect("Should cluster");
        for (profile, clustered) in table.iter().zip(&outcome.districts) {
            assert_eq!(outcome.model.predict(profile), clustered.risk_cluster);
        }
    }

    #[test]
    fn test_identical_districts() {
        let table = vec![district("A", 3.0, 3.0), district("B", 3.0, 3.0), district("C", 3.0, 3.0)];
        let outcome = clusterer(2).cluster(&table).expect("Should cluster");
        assert!(outcome.districts.iter().all(|d| d.risk_cluster == 0));
        assert_eq!(outcome.model.kmeans.inertia, 0.0);
        assert_eq!(outcome.clusters_in_use(), 1);
    }

    #[test]
    fn test_clusters_in_use_when_separable() {
        let outcome = clusterer(3).cluster(&kerala()).expect("Should cluster");
        assert_eq!(outcome.clusters_in_use(), 3);
    }

    #[test]
    fn test_missing_markers_in_csv_still_give_k_clusters() {
        let data = "district,piped_water_dwelling_pct,own_well_pct,community_water_pct,surface_water_pct,one_toilet_pct,two_toilet_pct,three_plus_toilet_pct,water_risk_rating,sanitation_risk_rating,crowding_risk_rating,healthcare_access_risk_rating,overall_risk_rating
Alappuzha,NaN,60,10,5,50,30,20,8,7,7.5,3,7.6
Kottayam,25,NA,12,4,55,28,17,7.8,6.5,7,3,7.2
Idukki,80,15,3,N/A,70,20,10,2,1.5,1,3,1.9
Wayanad,78,17,null,1,72,18,10,2.2,1.4,1.2,3,2.0
";
        let table = read_profiles(data.as_bytes()).expect("Should parse");
        let outcome = clusterer(2).cluster(&table).expect("Should cluster");

        assert!(outcome.model.kmeans.inertia.is_finite());
        assert_eq!(outcome.clusters_in_use(), 2);
        let ids = outcome.assignments();
        assert_eq!(ids["Alappuzha"], ids["Kottayam"]);
        assert_eq!(ids["Idukki"], ids["Wayanad"]);
        assert_ne!(ids["Alappuzha"], ids["Idukki"]);
    }

    #[test]
    fn test_empty_table() {
        let err = clusterer(4).cluster(&[]).expect_err("Should fail");
        assert_eq!(err, DataError::EmptyTable("districts"));
    }

    #[test]
    fn test_fewer_districts_than_clusters() {
        let err = clusterer(4).cluster(&kerala()[..3]).expect_err("Should fail");
        assert_eq!(err, DataError::InsufficientRows { rows: 3, clusters: 4 });
    }

    #[test]
    fn test_zero_clusters() {
        let err = clusterer(0).cluster(&kerala()).expect_err("Should fail");
        assert_eq!(err, DataError::InvalidClusterCount);
    }
}
