//! Uniform-grid point index for radius queries

use std::collections::HashMap;

/// Planar points bucketed into square cells
///
/// Points with a NaN coordinate are stored but never returned by a query.
#[derive(Debug, Clone)]
pub struct PointIndex {
    cell_size: f64,
    points: Vec<(f64, f64)>,
    grid: HashMap<(i64, i64), Vec<usize>>,
}

impl PointIndex {
    /// Build an index; `cell_size` should be close to the query radius
    pub fn new(points: Vec<(f64, f64)>, cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, &(x, y)) in points.iter().enumerate() {
            if x.is_nan() || y.is_nan() {
                continue;
            }
            grid.entry(cell_of(x, y, cell_size)).or_default().push(i);
        }
        Self {
            cell_size,
            points,
            grid,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> (f64, f64) {
        self.points[index]
    }

    /// Indices of all points within `radius` of `(x, y)`, ascending
    ///
    /// A stored point at exactly `(x, y)` is included.
    pub fn within(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        if x.is_nan() || y.is_nan() {
            return Vec::new();
        }
        let (cx, cy) = cell_of(x, y, self.cell_size);
        let reach = (radius / self.cell_size).ceil() as i64;
        let radius_sq = radius * radius;

        let mut found = Vec::new();
        for gx in cx - reach..=cx + reach {
            for gy in cy - reach..=cy + reach {
                let Some(bucket) = self.grid.get(&(gx, gy)) else {
                    continue;
                };
                for &i in bucket {
                    let (px, py) = self.points[i];
                    if (px - x).powi(2) + (py - y).powi(2) <= radius_sq {
                        found.push(i);
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }
}

fn cell_of(x: f64, y: f64, size: f64) -> (i64, i64) {
    ((x / size).floor() as i64, (y / size).floor() as i64)
}
