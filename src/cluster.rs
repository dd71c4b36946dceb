// Site clustering: aggregate device counts per site, standardize the
// selected features, partition the sites with k-means and project the
// standardized matrix onto its two principal components for plotting.
//
// Everything here is deterministic: k-means restarts and the power
// iteration start vector draw from ChaCha8 streams derived from a fixed
// seed, so repeated runs on the same data produce identical assignments
// and coordinates.
use crate::error::AppError;
use crate::types::{ClusterAssignment, DeviceKind, ProjectRecord, SiteAggregate};
use crate::util::average;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Base seed for centroid initialization and the PCA start vector.
pub const CLUSTER_SEED: u64 = 42;
/// k-means restarts; restart i uses seed CLUSTER_SEED + i and the run with
/// the lowest inertia wins.
const RESTARTS: usize = 10;
const MAX_ITERATIONS: usize = 300;
const POWER_STEPS: usize = 500;
const CONVERGENCE_EPS: f64 = 1e-9;

/// Sum device counts per distinct site, ordered by first appearance in the
/// project list.
pub fn aggregate_sites(projects: &[ProjectRecord]) -> Vec<SiteAggregate> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, crate::types::DeviceCounts> = HashMap::new();
    for p in projects {
        if !sums.contains_key(&p.site) {
            order.push(p.site.clone());
        }
        sums.entry(p.site.clone()).or_default().add(&p.counts);
    }
    order
        .into_iter()
        .map(|site| {
            let counts = sums.remove(&site).unwrap_or_default();
            SiteAggregate { site, counts }
        })
        .collect()
}

/// Partition sites into k groups and attach the 2D principal-component
/// projection of each site.
///
/// k is clamped to the supported [2, 8] range. Fewer sites than groups is
/// an `InsufficientData` error; a fully degenerate feature matrix (all
/// zero after standardization) collapses into a single occupied cluster
/// without failing.
pub fn cluster_sites(
    aggregates: &[SiteAggregate],
    features: &[DeviceKind],
    k: usize,
) -> Result<Vec<ClusterAssignment>, AppError> {
    let k = k.clamp(2, 8);
    if aggregates.len() < k {
        return Err(AppError::InsufficientData {
            sites: aggregates.len(),
            k,
        });
    }

    let mut matrix: Vec<Vec<f64>> = aggregates
        .iter()
        .map(|a| features.iter().map(|&f| a.counts.get(f) as f64).collect())
        .collect();
    standardize(&mut matrix);

    let (mut assignments, mut best_inertia) = run_kmeans(&matrix, k, CLUSTER_SEED);
    for restart in 1..RESTARTS {
        let (candidate, inertia) = run_kmeans(&matrix, k, CLUSTER_SEED + restart as u64);
        if inertia < best_inertia {
            assignments = candidate;
            best_inertia = inertia;
        }
    }

    let points = principal_projection(&matrix);
    Ok(aggregates
        .iter()
        .zip(assignments)
        .zip(points)
        .map(|((agg, cluster_id), (projected_x, projected_y))| ClusterAssignment {
            site: agg.site.clone(),
            counts: agg.counts,
            cluster_id,
            projected_x,
            projected_y,
        })
        .collect())
}

/// Center each column on its mean and scale by its population standard
/// deviation. A zero-variance column stays all-zero after centering
/// instead of dividing by zero.
fn standardize(matrix: &mut [Vec<f64>]) {
    let n = matrix.len();
    if n == 0 {
        return;
    }
    let dims = matrix[0].len();
    for j in 0..dims {
        let column: Vec<f64> = matrix.iter().map(|row| row[j]).collect();
        let mean = average(&column);
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std_dev = variance.sqrt();
        for row in matrix.iter_mut() {
            row[j] -= mean;
            if std_dev > 0.0 {
                row[j] /= std_dev;
            }
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Ties go to the lowest centroid index, which keeps degenerate data
/// (all rows equal) from bouncing between clusters.
fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::MAX;
    for (ci, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best_distance {
            best_distance = d;
            best = ci;
        }
    }
    best
}

/// Row index farthest from its assigned centroid; used to re-seed a
/// centroid that ended up with no rows.
fn farthest_row(rows: &[Vec<f64>], assignments: &[usize], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = -1.0;
    for (ri, row) in rows.iter().enumerate() {
        let d = squared_distance(row, &centroids[assignments[ri]]);
        if d > best_distance {
            best_distance = d;
            best = ri;
        }
    }
    best
}

/// One seeded k-means run: k distinct rows as initial centroids, nearest
/// centroid assignment, mean recomputation, until nothing moves or the
/// iteration bound is hit. Returns the assignments and their inertia.
fn run_kmeans(rows: &[Vec<f64>], k: usize, seed: u64) -> (Vec<usize>, f64) {
    let n = rows.len();
    let dims = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // Partial Fisher-Yates: the first k slots end up as k distinct indices.
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    let mut centroids: Vec<Vec<f64>> = indices[..k].iter().map(|&i| rows[i].clone()).collect();

    let mut assignments = vec![0usize; n];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (ri, row) in rows.iter().enumerate() {
            let nearest = nearest_centroid(row, &centroids);
            if assignments[ri] != nearest {
                assignments[ri] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (ri, row) in rows.iter().enumerate() {
            counts[assignments[ri]] += 1;
            for (j, v) in row.iter().enumerate() {
                sums[assignments[ri]][j] += v;
            }
        }
        for ci in 0..k {
            let updated: Vec<f64> = if counts[ci] == 0 {
                rows[farthest_row(rows, &assignments, &centroids)].clone()
            } else {
                sums[ci].iter().map(|s| s / counts[ci] as f64).collect()
            };
            if updated != centroids[ci] {
                centroids[ci] = updated;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let inertia = rows
        .iter()
        .enumerate()
        .map(|(ri, row)| squared_distance(row, &centroids[assignments[ri]]))
        .sum();
    (assignments, inertia)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, v)).collect()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Dominant eigenvector of a symmetric positive-semidefinite matrix via
/// power iteration, together with its eigenvalue. Returns `None` when the
/// matrix annihilates the iterate, i.e. there is no variance to capture.
fn dominant_eigenvector(matrix: &[Vec<f64>]) -> Option<(Vec<f64>, f64)> {
    let dims = matrix.len();
    if dims == 0 {
        return None;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(CLUSTER_SEED);
    let mut v: Vec<f64> = (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let start_norm = norm(&v);
    if start_norm == 0.0 {
        return None;
    }
    for x in &mut v {
        *x /= start_norm;
    }
    for _ in 0..POWER_STEPS {
        let mut next = mat_vec(matrix, &v);
        let len = norm(&next);
        if len < 1e-12 {
            return None;
        }
        for x in &mut next {
            *x /= len;
        }
        let delta = v
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        v = next;
        if delta < CONVERGENCE_EPS {
            break;
        }
    }
    let av = mat_vec(matrix, &v);
    let lambda = dot(&v, &av);
    Some((v, lambda))
}

fn deflate(matrix: &[Vec<f64>], v: &[f64], lambda: f64) -> Vec<Vec<f64>> {
    let dims = matrix.len();
    let mut out = vec![vec![0.0; dims]; dims];
    for i in 0..dims {
        for j in 0..dims {
            out[i][j] = matrix[i][j] - lambda * v[i] * v[j];
        }
    }
    out
}

/// Project the (already standardized) rows onto their top two directions
/// of maximal variance. With a single feature, or when the residual
/// variance vanishes, the missing component projects to 0.
fn principal_projection(rows: &[Vec<f64>]) -> Vec<(f64, f64)> {
    let n = rows.len();
    let dims = rows.first().map(|r| r.len()).unwrap_or(0);
    if n == 0 || dims == 0 {
        return vec![(0.0, 0.0); n];
    }

    // Population covariance; rows are centered by standardization.
    let mut cov = vec![vec![0.0; dims]; dims];
    for row in rows {
        for i in 0..dims {
            for j in 0..dims {
                cov[i][j] += row[i] * row[j];
            }
        }
    }
    for r in cov.iter_mut() {
        for v in r.iter_mut() {
            *v /= n as f64;
        }
    }

    let first = dominant_eigenvector(&cov);
    let second = first
        .as_ref()
        .and_then(|(v1, lambda)| dominant_eigenvector(&deflate(&cov, v1, *lambda)));

    rows.iter()
        .map(|row| {
            let x = first.as_ref().map(|(v, _)| dot(row, v)).unwrap_or(0.0);
            let y = second.as_ref().map(|(v, _)| dot(row, v)).unwrap_or(0.0);
            (x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceCounts;

    fn site(name: &str, water: u32, heat: u32) -> SiteAggregate {
        SiteAggregate {
            site: name.to_string(),
            counts: DeviceCounts {
                water_meters: water,
                heat_meters: heat,
                ..DeviceCounts::default()
            },
        }
    }

    fn record(site: &str, water: u32, heat: u32) -> ProjectRecord {
        ProjectRecord {
            site: site.to_string(),
            site_object: String::new(),
            counts: DeviceCounts {
                water_meters: water,
                heat_meters: heat,
                ..DeviceCounts::default()
            },
            note: String::new(),
        }
    }

    #[test]
    fn aggregation_sums_per_site_in_first_appearance_order() {
        let projects = vec![
            record("Kiel", 10, 1),
            record("Lübeck", 3, 0),
            record("Kiel", 5, 2),
        ];
        let aggregates = aggregate_sites(&projects);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].site, "Kiel");
        assert_eq!(aggregates[0].counts.water_meters, 15);
        assert_eq!(aggregates[0].counts.heat_meters, 3);
        assert_eq!(aggregates[1].site, "Lübeck");
    }

    #[test]
    fn separated_pairs_land_in_different_clusters() {
        let aggregates = vec![
            site("A", 0, 0),
            site("B", 0, 0),
            site("C", 100, 100),
            site("D", 100, 100),
        ];
        let features = [DeviceKind::WaterMeter, DeviceKind::HeatMeter];
        let run = cluster_sites(&aggregates, &features, 2).unwrap();
        // Assert co-membership, not literal ids: ids are arbitrary labels.
        assert_eq!(run[0].cluster_id, run[1].cluster_id);
        assert_eq!(run[2].cluster_id, run[3].cluster_id);
        assert_ne!(run[0].cluster_id, run[2].cluster_id);

        let rerun = cluster_sites(&aggregates, &features, 2).unwrap();
        let ids: Vec<usize> = run.iter().map(|a| a.cluster_id).collect();
        let rerun_ids: Vec<usize> = rerun.iter().map(|a| a.cluster_id).collect();
        assert_eq!(ids, rerun_ids);
    }

    #[test]
    fn all_zero_matrix_does_not_crash() {
        let aggregates: Vec<SiteAggregate> =
            (0..5).map(|i| site(&format!("S{i}"), 0, 0)).collect();
        let run = cluster_sites(&aggregates, &DeviceKind::ALL, 3).unwrap();
        assert_eq!(run.len(), 5);
        for assignment in &run {
            assert!(assignment.cluster_id < 3);
            assert_eq!(assignment.projected_x, 0.0);
            assert_eq!(assignment.projected_y, 0.0);
        }
    }

    #[test]
    fn fewer_sites_than_groups_is_an_error() {
        let aggregates = vec![site("A", 1, 0), site("B", 2, 0)];
        let err = cluster_sites(&aggregates, &[DeviceKind::WaterMeter], 3).unwrap_err();
        match err {
            AppError::InsufficientData { sites, k } => {
                assert_eq!(sites, 2);
                assert_eq!(k, 3);
            }
            other => panic!("expected insufficient-data error, got {other:?}"),
        }
    }

    #[test]
    fn zero_variance_column_stays_zero_after_standardization() {
        let mut matrix = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        standardize(&mut matrix);
        for row in &matrix {
            assert_eq!(row[0], 0.0);
        }
        // The varying column is centered and scaled.
        let mean: f64 = matrix.iter().map(|r| r[1]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
    }

    #[test]
    fn projection_separates_the_two_groups() {
        let aggregates = vec![
            site("A", 0, 0),
            site("B", 0, 0),
            site("C", 100, 100),
            site("D", 100, 100),
        ];
        let features = [DeviceKind::WaterMeter, DeviceKind::HeatMeter];
        let run = cluster_sites(&aggregates, &features, 2).unwrap();
        // Both features move together, so the first component carries all
        // variance and the pairs sit on opposite sides of the origin.
        assert!(run[0].projected_x * run[2].projected_x < 0.0);
        assert!((run[0].projected_x - run[1].projected_x).abs() < 1e-9);
    }

    #[test]
    fn single_feature_projects_to_one_dimension() {
        let aggregates = vec![site("A", 0, 0), site("B", 10, 0), site("C", 20, 0)];
        let run = cluster_sites(&aggregates, &[DeviceKind::WaterMeter], 2).unwrap();
        for assignment in &run {
            assert_eq!(assignment.projected_y, 0.0);
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let aggregates = vec![
            site("A", 1, 9),
            site("B", 2, 8),
            site("C", 40, 1),
            site("D", 42, 2),
            site("E", 20, 20),
        ];
        let a = cluster_sites(&aggregates, &DeviceKind::ALL, 3).unwrap();
        let b = cluster_sites(&aggregates, &DeviceKind::ALL, 3).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.cluster_id, y.cluster_id);
            assert_eq!(x.projected_x, y.projected_x);
            assert_eq!(x.projected_y, y.projected_y);
        }
    }
}
