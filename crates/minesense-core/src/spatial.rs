//! Density-based clustering (DBSCAN) over arbitrary points.
//!
//! Used at two scales: anomalous cells of a thermal frame (grid units) and
//! georeferenced detections (coordinate units or metres). [`dbscan`] takes a
//! caller-supplied distance and compares every pair, which suits the small
//! detection sets. [`grid_dbscan`] works on integer cells of a known grid and
//! only looks inside a square window around each cell, so its cost grows with
//! the number of cells rather than its square.
//!
//! Labels are assigned in input order, so the same input with the same
//! parameters always yields the same clustering.

use ndarray::Array2;

/// Runs DBSCAN and returns one label per input point (`None` = noise).
///
/// Two points are neighbors when their distance is strictly below `epsilon`.
/// A point is a core point when it has at least `min_points` neighbors,
/// itself included. Border points join the first cluster that reaches them.
#[must_use]
pub fn dbscan<P, F>(points: &[P], epsilon: f64, min_points: usize, distance: F) -> Vec<Option<usize>>
where
    F: Fn(&P, &P) -> f64,
{
    if !(epsilon > 0.0) {
        return vec![None; points.len()];
    }
    expand_clusters(points.len(), min_points, |i, out| {
        out.extend((0..points.len()).filter(|&j| i == j || distance(&points[i], &points[j]) < epsilon));
    })
}

/// DBSCAN over cells `(row, col)` of a `shape`-sized grid with Euclidean
/// cell distance.
///
/// Produces the same labels as [`dbscan`] with a planar distance, but each
/// neighborhood query only visits the `(2 * ceil(epsilon) + 1)^2` window
/// around the cell. Cells are expected to be distinct; cells outside `shape`
/// only ever neighbor themselves.
#[must_use]
pub fn grid_dbscan(
    cells: &[(usize, usize)],
    shape: (usize, usize),
    epsilon: f64,
    min_points: usize,
) -> Vec<Option<usize>> {
    if !(epsilon > 0.0) {
        return vec![None; cells.len()];
    }
    let index = CellIndex::new(cells, shape);
    expand_clusters(cells.len(), min_points, |i, out| {
        index.neighbors(cells, i, epsilon, out);
    })
}

/// Core expansion shared by both variants. `neighbors(i, out)` appends the
/// indices within epsilon of point `i`, including `i` itself.
fn expand_clusters<F>(n: usize, min_points: usize, mut neighbors: F) -> Vec<Option<usize>>
where
    F: FnMut(usize, &mut Vec<usize>),
{
    let mut labels = vec![None; n];
    let min_points = min_points.max(1);
    let mut buf = Vec::new();

    let is_core: Vec<bool> = (0..n)
        .map(|i| {
            buf.clear();
            neighbors(i, &mut buf);
            buf.len() >= min_points
        })
        .collect();

    let mut next_label = 0;
    let mut stack = Vec::new();
    for seed in 0..n {
        if labels[seed].is_some() || !is_core[seed] {
            continue;
        }
        labels[seed] = Some(next_label);
        stack.push(seed);
        while let Some(current) = stack.pop() {
            buf.clear();
            neighbors(current, &mut buf);
            for &nb in &buf {
                if labels[nb].is_none() {
                    labels[nb] = Some(next_label);
                    if is_core[nb] {
                        stack.push(nb);
                    }
                }
            }
        }
        next_label += 1;
    }

    labels
}

/// Dense lookup from grid cell to point index.
struct CellIndex {
    slots: Array2<Option<usize>>,
}

impl CellIndex {
    fn new(cells: &[(usize, usize)], shape: (usize, usize)) -> Self {
        let mut slots = Array2::from_elem(shape, None);
        for (i, &cell) in cells.iter().enumerate() {
            if let Some(slot) = slots.get_mut(cell) {
                // first occurrence wins for duplicated cells
                if slot.is_none() {
                    *slot = Some(i);
                }
            }
        }
        Self { slots }
    }

    /// Appends neighbors of `cells[i]` to `out` and returns the number of
    /// grid slots visited.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn neighbors(&self, cells: &[(usize, usize)], i: usize, epsilon: f64, out: &mut Vec<usize>) -> usize {
        let (rows, cols) = self.slots.dim();
        let (row, col) = cells[i];
        if row >= rows || col >= cols {
            out.push(i);
            return 0;
        }
        let reach = (epsilon.ceil() as usize).min(rows.max(cols));
        let eps_sq = epsilon * epsilon;
        let mut visited = 0;
        for r in row.saturating_sub(reach)..=(row + reach).min(rows - 1) {
            let dr = r.abs_diff(row) as f64;
            for c in col.saturating_sub(reach)..=(col + reach).min(cols - 1) {
                visited += 1;
                let Some(j) = self.slots[(r, c)] else { continue };
                let dc = c.abs_diff(col) as f64;
                if j == i || dr * dr + dc * dc < eps_sq {
                    out.push(j);
                }
            }
        }
        if self.slots[(row, col)] != Some(i) {
            // duplicate of an indexed cell: reach itself explicitly
            out.push(i);
        }
        visited
    }
}

/// Groups point indices by cluster label, in label order.
#[must_use]
pub fn group_labels(labels: &[Option<usize>]) -> Vec<Vec<usize>> {
    let count = labels.iter().flatten().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); count];
    for (idx, label) in labels.iter().enumerate() {
        if let Some(l) = label {
            groups[*l].push(idx);
        }
    }
    groups
}

/// Euclidean distance between two planar points.
#[must_use]
pub fn planar_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_groups_and_noise() {
        let points = [
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [50.0, 50.0],
            [50.0, 51.0],
            [200.0, 200.0],
        ];
        let labels = dbscan(&points, 2.0, 2, planar_distance);
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(1), Some(1), None]);

        let groups = group_labels(&labels);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_chain_is_single_cluster() {
        let points: Vec<[f64; 2]> = (0..10).map(|i| [f64::from(i) * 5.0, 0.0]).collect();
        let labels = dbscan(&points, 6.0, 2, planar_distance);
        assert!(labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn test_border_point_not_expanded() {
        // middle point is core with min_points = 3, ends are border points
        let points = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.5, 0.0]];
        let labels = dbscan(&points, 1.2, 3, planar_distance);
        assert_eq!(labels[0], Some(0));
        assert_eq!(labels[1], Some(0));
        assert_eq!(labels[2], Some(0));
        assert_eq!(labels[3], None);
    }

    #[test]
    fn test_degenerate_parameters() {
        let points = [[0.0, 0.0], [0.0, 0.0]];
        assert_eq!(dbscan(&points, 0.0, 2, planar_distance), vec![None, None]);
        assert!(dbscan::<[f64; 2], _>(&[], 1.0, 2, planar_distance).is_empty());
    }

    #[test]
    fn test_grid_variant_matches_all_pairs() {
        // scattered blobs, a diagonal chain and isolated cells
        let cells: Vec<(usize, usize)> = (0..40usize)
            .flat_map(|r| (0..60usize).map(move |c| (r, c)))
            .filter(|&(r, c)| (r * 7 + c * 13) % 11 == 0 || (r == c && r < 30) || (r > 30 && c > 50))
            .collect();
        let points: Vec<[f64; 2]> = cells.iter().map(|&(r, c)| [c as f64, r as f64]).collect();

        for (epsilon, min_points) in [(1.0, 1), (1.5, 2), (2.5, 3), (4.0, 5), (10.0, 2)] {
            assert_eq!(
                grid_dbscan(&cells, (40, 60), epsilon, min_points),
                dbscan(&points, epsilon, min_points, planar_distance),
                "epsilon {epsilon}, min_points {min_points}"
            );
        }
    }

    #[test]
    fn test_grid_variant_work_is_linear_in_cells() {
        // hot block covering ~9% of a 480x640 frame
        let (rows, cols) = (480, 640);
        let cells: Vec<(usize, usize)> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|&(r, c)| (96..240).contains(&r) && (128..320).contains(&c))
            .collect();
        let epsilon = 10.0;
        let index = CellIndex::new(&cells, (rows, cols));

        let mut visited = 0;
        let labels = expand_clusters(cells.len(), 2, |i, out| {
            visited += index.neighbors(&cells, i, epsilon, out);
        });

        assert!(labels.iter().all(|l| *l == Some(0)));
        let window = 21 * 21;
        assert!(visited <= 2 * cells.len() * window);
        // all-pairs would compare cells.len()^2 ~ 7.6e8 pairs
        assert!(visited < cells.len() * cells.len() / 10);
        assert_eq!(grid_dbscan(&cells, (rows, cols), epsilon, 2), labels);
    }

    #[test]
    fn test_grid_variant_degenerate_input() {
        assert_eq!(grid_dbscan(&[(0, 0), (0, 1)], (2, 2), 0.0, 1), vec![None, None]);
        assert!(grid_dbscan(&[], (0, 0), 3.0, 2).is_empty());
        // out-of-grid cell is its own neighborhood
        assert_eq!(grid_dbscan(&[(5, 5)], (2, 2), 3.0, 1), vec![Some(0)]);
        assert_eq!(grid_dbscan(&[(5, 5), (0, 0)], (2, 2), 3.0, 2), vec![None, None]);
    }

    #[test]
    fn test_deterministic() {
        let points: Vec<[f64; 2]> = (0..30)
            .map(|i| [f64::from(i % 7) * 3.0, f64::from(i / 7) * 3.0])
            .collect();
        let a = dbscan(&points, 3.5, 3, planar_distance);
        let b = dbscan(&points, 3.5, 3, planar_distance);
        assert_eq!(a, b);
    }
}
