use serial_test::serial;
use strata::array::prelude::*;

use std::time::Duration;

fn world(num_pes: usize) -> World {
    WorldBuilder::new()
        .with_num_pes(num_pes)
        .with_deadlock_timeout(60.0)
        .build()
}

fn every_index_exactly_once(num_pes: usize) {
    let world = world(num_pes);
    let visits = PartitionedArray::<usize>::new(&world, 103);
    let v = visits.clone();
    world.forall(0..103, move |i| v.add(i, 1)).unwrap();
    assert_eq!(vec![1; 103], visits.to_vec());
}

fn offset_range(num_pes: usize) {
    let world = world(num_pes);
    let visits = PartitionedArray::<usize>::new(&world, 50);
    let v = visits.clone();
    world.forall(20..45, move |i| v.add(i, i)).unwrap();
    let expected: Vec<usize> = (0..50).map(|i| if (20..45).contains(&i) { i } else { 0 }).collect();
    assert_eq!(expected, visits.to_vec());
}

fn chunks_run_on_owner(num_pes: usize) {
    let world = world(num_pes);
    let array = PartitionedArray::<usize>::new(&world, 41);
    let ran_on = PartitionedArray::<usize>::new(&world, 41);
    let r = ran_on.clone();
    let w = world.clone();
    array
        .for_each(move |i, _| r.write_async(i, w.my_pe().unwrap()))
        .unwrap();
    let owners: Vec<usize> = (0..41).map(|i| array.owner(i)).collect();
    assert_eq!(owners, ran_on.to_vec());
}

fn async_iteration_with_event(num_pes: usize) {
    let world = world(num_pes);
    let squares = PartitionedArray::<usize>::new(&world, 64);
    let s = squares.clone();
    let event = CompletionEvent::new();
    world.forall_async(0..64, move |i| s.write_async(i, i * i), &event);
    event.wait().unwrap();
    assert_eq!(0, event.outstanding());
    assert_eq!((0..64).map(|i| i * i).collect::<Vec<_>>(), squares.to_vec());

    let doubled = PartitionedArray::<usize>::new(&world, 64);
    let d = doubled.clone();
    let event = CompletionEvent::new();
    squares.for_each_async(move |i, val| d.write_async(i, val * 2), &event);
    world.wait_event(&event).unwrap();
    assert_eq!(
        (0..64).map(|i| 2 * i * i).collect::<Vec<_>>(),
        doubled.to_vec()
    );
}

fn worker_panic_is_reported(num_pes: usize) {
    let world = world(num_pes);
    let array = PartitionedArray::<usize>::new(&world, 10);
    let a = array.clone();
    match world.forall(0..20, move |i| a.write(i, i)) {
        Err(EngineError::WorkerPanic { msg, .. }) => {
            assert!(msg.contains("index out of bounds"), "{}", msg)
        }
        other => panic!("expected a worker panic, got {:?}", other),
    }
    // the world stays usable
    let a = array.clone();
    world.forall(0..10, move |i| a.write(i, i)).unwrap();
    assert_eq!((0..10).collect::<Vec<_>>(), array.to_vec());
}

fn empty_range(num_pes: usize) {
    let world = world(num_pes);
    let array = PartitionedArray::<usize>::new(&world, 4);
    let a = array.clone();
    world.forall(0..0, move |i| a.write(i, 1)).unwrap();
    assert_eq!(vec![0; 4], array.to_vec());
    let empty = PartitionedArray::<usize>::new(&world, 0);
    assert!(empty.is_empty());
    empty.for_each(|_, _| panic!("visited an empty array")).unwrap();
}

fn repeated_barriers(num_pes: usize) {
    let world = world(num_pes);
    for _ in 0..50 {
        world.barrier().unwrap();
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

create_test!(every_index_exactly_once, (1, 2, 3, 4, 7));
create_test!(offset_range, (1, 2, 4));
create_test!(chunks_run_on_owner, (1, 2, 3, 4));
create_test!(async_iteration_with_event, (1, 2, 4));
create_test!(worker_panic_is_reported, (1, 2, 4));
create_test!(empty_range, (1, 3));
create_test!(repeated_barriers, (1, 2, 4));

#[test]
#[serial]
fn blocked_chunk_times_out() {
    let world = WorldBuilder::new()
        .with_num_pes(2)
        .with_deadlock_timeout(0.2)
        .build();
    let event = CompletionEvent::new();
    world.forall_async(0..2, |_| std::thread::sleep(Duration::from_secs(1)), &event);
    match world.wait_event(&event) {
        Err(EngineError::Timeout { outstanding, .. }) => assert!(outstanding > 0),
        other => panic!("expected a timeout, got {:?}", other),
    }
    // let the sleeping chunks finish before the world shuts down
    event.wait_timeout(None).unwrap();
}
