use crate::error::{EngineError, EngineResult};
use crate::scheduler::{current_pe, Scheduler};
use crate::warnings::RuntimeWarning;

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A world-wide barrier.
///
/// Every barrier call gets a new id; an arrival task carrying that id is placed at the
/// back of every PE's queue. Queues are FIFO, so once every PE has published the id, all
/// work submitted to any PE before the barrier has been executed.
#[derive(Debug)]
pub(crate) struct Barrier {
    scheduler: Arc<Scheduler>,
    barrier_cnt: AtomicUsize,
    arrivals: Arc<Vec<CachePadded<AtomicUsize>>>,
    timeout: Option<Duration>,
}

impl Barrier {
    pub(crate) fn new(scheduler: Arc<Scheduler>, timeout: Option<Duration>) -> Barrier {
        let arrivals = (0..scheduler.num_pes())
            .map(|_| CachePadded::new(AtomicUsize::new(0)))
            .collect();
        Barrier {
            scheduler,
            barrier_cnt: AtomicUsize::new(0),
            arrivals: Arc::new(arrivals),
            timeout,
        }
    }

    fn put_barrier_val(&self, barrier_id: usize) {
        for pe in 0..self.arrivals.len() {
            let arrivals = self.arrivals.clone();
            self.scheduler.submit_task_pe(pe, async move {
                arrivals[pe].fetch_max(barrier_id, Ordering::SeqCst);
            });
        }
    }

    fn check_barrier_vals(&self, barrier_id: usize) -> EngineResult<()> {
        let s = Instant::now();
        let me = current_pe().filter(|pe| *pe < self.arrivals.len());
        for arrival in self.arrivals.iter() {
            while arrival.load(Ordering::SeqCst) < barrier_id {
                let progressed = match me {
                    Some(pe) => self.scheduler.exec_task(pe),
                    None => false,
                };
                if !progressed {
                    std::thread::yield_now();
                }
                if let Some(timeout) = self.timeout {
                    if s.elapsed() > timeout {
                        RuntimeWarning::DeadlockTimeout(
                            "Barrier",
                            s.elapsed().as_secs_f64(),
                            timeout.as_secs_f64(),
                        )
                        .print();
                        return Err(EngineError::Timeout {
                            what: "barrier",
                            elapsed: s.elapsed().as_secs_f64(),
                            outstanding: self
                                .arrivals
                                .iter()
                                .filter(|a| a.load(Ordering::SeqCst) < barrier_id)
                                .count(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn barrier(&self) -> EngineResult<()> {
        let barrier_id = self.barrier_cnt.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(barrier_id, "entering barrier");
        self.put_barrier_val(barrier_id);
        self.check_barrier_vals(barrier_id)
    }
}
