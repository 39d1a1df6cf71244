use serial_test::serial;
use strata::kmeans::{KMeans, Point};
use strata::{World, WorldBuilder};

fn world(num_pes: usize) -> World {
    WorldBuilder::new()
        .with_num_pes(num_pes)
        .with_deadlock_timeout(60.0)
        .build()
}

fn approx_eq<const D: usize>(a: &Point<D>, b: &Point<D>) -> bool {
    a.distance_squared(b) < 1e-18
}

fn two_clusters_converge(num_pes: usize) {
    let world = world(num_pes);
    let points: Vec<Point<2>> = vec![
        [0.0, 0.0].into(),
        [0.0, 1.0].into(),
        [10.0, 10.0].into(),
        [10.0, 11.0].into(),
    ];
    let initial: Vec<Point<2>> = vec![[0.0, 0.0].into(), [10.0, 10.0].into()];
    let kmeans = KMeans::new(&world, &points, &initial);
    kmeans.run(2).unwrap();
    let centroids = kmeans.centroids();
    assert!(approx_eq(&Point::new([0.0, 0.5]), &centroids[0]), "{:?}", centroids);
    assert!(approx_eq(&Point::new([10.0, 10.5]), &centroids[1]), "{:?}", centroids);
    assert_eq!(vec![0, 0, 1, 1], kmeans.assignments());
    assert_eq!(vec![2, 2], kmeans.populations());
}

fn tie_assigns_later_centroid(num_pes: usize) {
    let world = world(num_pes);
    let points: Vec<Point<1>> = vec![[0.0].into(), [5.0].into(), [-5.0].into()];
    let initial: Vec<Point<1>> = vec![[-5.0].into(), [5.0].into()];
    let kmeans = KMeans::new(&world, &points, &initial);
    kmeans.assign().unwrap();
    // 0.0 is equidistant from both centroids
    assert_eq!(vec![1, 1, 0], kmeans.assignments());
}

fn empty_cluster_keeps_centroid(num_pes: usize) {
    let world = world(num_pes);
    let points: Vec<Point<2>> = vec![[1.0, 1.0].into(), [3.0, 3.0].into(), [2.0, 5.0].into()];
    let initial: Vec<Point<2>> = vec![[2.0, 2.0].into(), [100.0, 100.0].into()];
    let kmeans = KMeans::new(&world, &points, &initial);
    kmeans.iterate().unwrap();
    assert_eq!(vec![3, 0], kmeans.populations());
    let centroids = kmeans.centroids();
    assert!(approx_eq(&Point::new([2.0, 3.0]), &centroids[0]), "{:?}", centroids);
    assert_eq!(Point::new([100.0, 100.0]), centroids[1]);
}

fn centroid_is_mean_of_members(num_pes: usize) {
    let world = world(num_pes);
    // 60 points around three well separated centres
    let centres = [[0.0, 0.0], [50.0, 0.0], [0.0, 50.0]];
    let points: Vec<Point<2>> = (0..60)
        .map(|i| {
            let c = centres[i % 3];
            let jitter = (i / 3) as f64 * 0.1;
            Point::new([c[0] + jitter, c[1] - jitter])
        })
        .collect();
    let initial: Vec<Point<2>> = centres.iter().map(|c| Point::new(*c)).collect();
    let kmeans = KMeans::new(&world, &points, &initial);
    kmeans.run(3).unwrap();
    let assignments = kmeans.assignments();
    let centroids = kmeans.centroids();
    let populations = kmeans.populations();
    for k in 0..3 {
        let members: Vec<&Point<2>> = points
            .iter()
            .zip(assignments.iter())
            .filter(|(_, a)| **a == k)
            .map(|(p, _)| p)
            .collect();
        assert_eq!(members.len(), populations[k]);
        let mut sum = Point::<2>::default();
        for p in &members {
            sum += **p;
        }
        let mean = sum / members.len() as f64;
        assert!(approx_eq(&mean, &centroids[k]), "{:?} {:?}", mean, centroids[k]);
    }
}

macro_rules! create_test {
    ($name:ident, ($($num_pes:expr),*)) => {
        paste::paste! {
            $(
                #[test]
                #[serial]
                fn [<$name _ $num_pes _pes>]() {
                    $name($num_pes);
                }
            )*
        }
    };
}

create_test!(two_clusters_converge, (1, 2, 3, 4));
create_test!(tie_assigns_later_centroid, (1, 2, 3));
create_test!(empty_cluster_keeps_centroid, (1, 2, 4));
create_test!(centroid_is_mean_of_members, (1, 2, 4));
