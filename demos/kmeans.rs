use rand::distributions::{Distribution, Uniform};
use rand::seq::SliceRandom;
use strata::kmeans::{KMeans, Point};
use tracing_subscriber::EnvFilter;

const DIMS: usize = 2;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = std::env::args().collect();
    let num_points = args
        .get(1)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000);
    let k = args.get(2).and_then(|s| s.parse::<usize>().ok()).unwrap_or(4);
    let iterations = args.get(3).and_then(|s| s.parse::<usize>().ok()).unwrap_or(10);

    let world = strata::WorldBuilder::new().build();
    let mut rng = rand::thread_rng();

    // points scattered around k random centres
    let spread = Uniform::new(-1.0, 1.0);
    let space = Uniform::new(-100.0, 100.0);
    let centres: Vec<Point<DIMS>> = (0..k)
        .map(|_| Point::new([space.sample(&mut rng), space.sample(&mut rng)]))
        .collect();
    let points: Vec<Point<DIMS>> = (0..num_points)
        .map(|i| {
            let centre = centres[i % k];
            centre + Point::new([spread.sample(&mut rng), spread.sample(&mut rng)])
        })
        .collect();
    let initial: Vec<Point<DIMS>> = points.choose_multiple(&mut rng, k).cloned().collect();

    let timer = std::time::Instant::now();
    let kmeans = KMeans::new(&world, &points, &initial);
    kmeans.run(iterations)?;
    println!(
        "{} points, {} clusters, {} iterations on {} pes in {:?}",
        num_points,
        k,
        iterations,
        world.num_pes(),
        timer.elapsed()
    );
    for (centroid, population) in kmeans.centroids().iter().zip(kmeans.populations()) {
        println!("{:>10.3?} {}", centroid.coords, population);
    }
    Ok(())
}
