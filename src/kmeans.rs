//! Iterative k-means clustering over a [PartitionedArray] of points.
//!
//! Every iteration runs three engine calls, each ending in a barrier, so the centroids
//! written by one iteration are visible to every PE before the next Assign phase:
//!
//! 1. **Assign**: the centroids are snapshotted and every point's owner records the index
//!    of the closest centroid ([closest]).
//! 2. **Aggregate**: the running sums and populations are reset, then every point is added
//!    into the sums of its cluster with atomic increments.
//! 3. **Update**: every cluster with a non-zero population moves to the mean of its points;
//!    empty clusters keep their centroid.
use crate::array::PartitionedArray;
use crate::error::EngineResult;
use crate::World;

use std::ops::{Add, AddAssign, Div};
use std::sync::Arc;

/// A point in `D` dimensional space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<const D: usize> {
    pub coords: [f64; D],
}

impl<const D: usize> Point<D> {
    pub fn new(coords: [f64; D]) -> Point<D> {
        Point { coords }
    }

    pub fn distance_squared(&self, other: &Point<D>) -> f64 {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl<const D: usize> Default for Point<D> {
    fn default() -> Self {
        Point { coords: [0.0; D] }
    }
}

impl<const D: usize> From<[f64; D]> for Point<D> {
    fn from(coords: [f64; D]) -> Self {
        Point { coords }
    }
}

impl<const D: usize> AddAssign for Point<D> {
    fn add_assign(&mut self, other: Point<D>) {
        for (a, b) in self.coords.iter_mut().zip(other.coords) {
            *a += b;
        }
    }
}

impl<const D: usize> Add for Point<D> {
    type Output = Point<D>;
    fn add(mut self, other: Point<D>) -> Point<D> {
        self += other;
        self
    }
}

impl<const D: usize> Div<f64> for Point<D> {
    type Output = Point<D>;
    fn div(mut self, divisor: f64) -> Point<D> {
        for a in self.coords.iter_mut() {
            *a /= divisor;
        }
        self
    }
}

/// Index of the centroid closest to `point`.
///
/// Centroids are scanned in index order and a candidate replaces the current best whenever
/// its squared distance is less than *or equal to* the best so far, so on a tie the
/// centroid with the highest index wins.
pub fn closest<const D: usize>(point: &Point<D>, centroids: &[Point<D>]) -> usize {
    let mut best = 0;
    let mut min_d = f64::INFINITY;
    for (k, centroid) in centroids.iter().enumerate() {
        let d = point.distance_squared(centroid);
        if d <= min_d {
            min_d = d;
            best = k;
        }
    }
    best
}

/// The state of a k-means run: points, their cluster assignments and the per-cluster
/// centroids, running sums and populations, all distributed across the world.
///
/// The assignment array has the same length (and therefore the same distribution) as the
/// point array, so every assignment is written by the PE owning the point.
#[derive(Clone, Debug)]
pub struct KMeans<const D: usize> {
    world: World,
    points: PartitionedArray<Point<D>>,
    assignments: PartitionedArray<usize>,
    centroids: PartitionedArray<Point<D>>,
    sums: PartitionedArray<Point<D>>,
    population: PartitionedArray<usize>,
}

impl<const D: usize> KMeans<D> {
    /// Distribute `points` and the `initial` centroids across `world`.
    ///
    /// Panics if `initial` is empty.
    pub fn new(world: &World, points: &[Point<D>], initial: &[Point<D>]) -> KMeans<D> {
        assert!(!initial.is_empty(), "k-means requires at least one centroid");
        let k = initial.len();
        let kmeans = KMeans {
            world: world.clone(),
            points: PartitionedArray::new(world, points.len()),
            assignments: PartitionedArray::new(world, points.len()),
            centroids: PartitionedArray::new(world, k),
            sums: PartitionedArray::new(world, k),
            population: PartitionedArray::new(world, k),
        };
        kmeans.points.put_slice(0, points);
        kmeans.centroids.put_slice(0, initial);
        tracing::debug!(n = points.len(), k, dims = D, "k-means initialized");
        kmeans
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Record the closest centroid of every point
    pub fn assign(&self) -> EngineResult<()> {
        let centroids = Arc::new(self.centroids.to_vec());
        let assignments = self.assignments.clone();
        self.points.for_each(move |i, point| {
            assignments.write_async(i, closest(&point, &centroids));
        })
    }

    /// Accumulate the sum and population of every cluster
    pub fn aggregate(&self) -> EngineResult<()> {
        self.sums.fill(Point::default())?;
        self.population.fill(0)?;
        let assignments = self.assignments.clone();
        let sums = self.sums.clone();
        let population = self.population.clone();
        self.points.for_each(move |i, point| {
            let k = assignments.read(i);
            sums.add(k, point);
            population.add(k, 1);
        })
    }

    /// Move every non-empty cluster's centroid to the mean of its points
    pub fn update(&self) -> EngineResult<()> {
        let sums = self.sums.clone();
        let population = self.population.clone();
        self.centroids.for_each_mut(move |k, centroid| {
            let n = population.read(k);
            if n > 0 {
                *centroid = sums.read(k) / n as f64;
            } else {
                tracing::debug!(cluster = k, "empty cluster keeps its centroid");
            }
        })
    }

    /// One full assign, aggregate, update iteration
    pub fn iterate(&self) -> EngineResult<()> {
        self.assign()?;
        self.aggregate()?;
        self.update()
    }

    /// Run a fixed number of iterations
    pub fn run(&self, iterations: usize) -> EngineResult<()> {
        for iteration in 0..iterations {
            let _span = tracing::info_span!("kmeans", iteration).entered();
            self.iterate()?;
            tracing::debug!(centroids = ?self.centroids.to_vec(), "iteration complete");
        }
        Ok(())
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Snapshot of the current centroids
    pub fn centroids(&self) -> Vec<Point<D>> {
        self.centroids.to_vec()
    }

    /// Snapshot of the cluster index of every point
    pub fn assignments(&self) -> Vec<usize> {
        self.assignments.to_vec()
    }

    /// Snapshot of the number of points in every cluster, as of the last aggregate
    pub fn populations(&self) -> Vec<usize> {
        self.population.to_vec()
    }
}
