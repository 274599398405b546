//! Cross-process reduction of estimator moments
//!
//! The estimator only needs a sum-onto-root collective. Anything providing
//! it, MPI bindings included, can implement [Communicator]. A
//! [LocalCommunicator] group stands in for a set of ranks inside a single
//! process.

// standard library
use std::sync::{Arc, Barrier, Mutex};

// crate modules
use crate::error::{Error, Result};

// ntally modules
use ntally_utils::f;

// external crates
use log::trace;

/// Collective operations needed to reduce estimator data
pub trait Communicator {
    /// Rank of this process in the group
    fn rank(&self) -> usize;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    /// Element-wise sum of `data` over every rank, stored on `root`
    ///
    /// Must be called by every rank. The root receives the sum in place, the
    /// buffers on other ranks are left as they were. If the call fails it
    /// fails on every rank.
    fn reduce_sum(&self, data: &mut [f64], root: usize) -> Result<()>;
}

/// Group of in-process ranks, one per thread
///
/// ```rust
/// # use ntally_estimator::{Communicator, LocalCommunicator};
/// let group = LocalCommunicator::group(3);
///
/// let results: Vec<Vec<f64>> = std::thread::scope(|s| {
///     let handles: Vec<_> = group
///         .iter()
///         .map(|comm| {
///             s.spawn(move || {
///                 let mut data = vec![comm.rank() as f64, 1.0];
///                 comm.reduce_sum(&mut data, 0).unwrap();
///                 data
///             })
///         })
///         .collect();
///     handles.into_iter().map(|h| h.join().unwrap()).collect()
/// });
///
/// assert_eq!(results[0], vec![3.0, 3.0]);
/// assert_eq!(results[2], vec![2.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct LocalCommunicator {
    rank: usize,
    shared: Arc<SharedState>,
}

#[derive(Debug)]
struct SharedState {
    size: usize,
    barrier: Barrier,
    contributions: Mutex<Vec<Option<Vec<f64>>>>,
    outcome: Mutex<Option<std::result::Result<Vec<f64>, String>>>,
}

impl LocalCommunicator {
    /// Create every rank of a group, zero is treated as one
    pub fn group(size: usize) -> Vec<LocalCommunicator> {
        let size = size.max(1);
        let shared = Arc::new(SharedState {
            size,
            barrier: Barrier::new(size),
            contributions: Mutex::new(vec![None; size]),
            outcome: Mutex::new(None),
        });

        (0..size)
            .map(|rank| LocalCommunicator {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Sum the collected contributions, failing on mismatched lengths
    ///
    /// Every contribution is taken, so a failed reduction leaves nothing
    /// behind for the next one.
    fn sum_contributions(&self) -> std::result::Result<Vec<f64>, String> {
        let contributions: Vec<Option<Vec<f64>>> = self
            .shared
            .contributions
            .lock()
            .map_err(|_| "contributions lock poisoned by a failed rank".to_string())?
            .iter_mut()
            .map(Option::take)
            .collect();

        let mut sum: Option<Vec<f64>> = None;
        for (rank, data) in contributions.into_iter().enumerate() {
            let Some(data) = data else {
                return Err(f!("rank {rank} did not contribute"));
            };

            match sum.as_mut() {
                None => sum = Some(data),
                Some(total) if total.len() == data.len() => {
                    for (t, v) in total.iter_mut().zip(&data) {
                        *t += v;
                    }
                }
                Some(total) => {
                    return Err(f!(
                        "rank {rank} sent {} values, expected {}",
                        data.len(),
                        total.len()
                    ))
                }
            }
        }

        sum.ok_or_else(|| "no contributions".to_string())
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::ReductionFailed("lock poisoned by a failed rank".to_string())
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn reduce_sum(&self, data: &mut [f64], root: usize) -> Result<()> {
        if root >= self.size() {
            return Err(Error::InvalidRoot {
                root,
                size: self.size(),
            });
        }

        if self.size() == 1 {
            return Ok(());
        }

        // no early returns between the barriers, or the other ranks never wake
        let staged = self
            .shared
            .contributions
            .lock()
            .map(|mut c| c[self.rank] = Some(data.to_vec()))
            .map_err(poisoned);
        self.shared.barrier.wait();

        // every contribution is in, the root settles the outcome for all
        if self.rank == root {
            let outcome = self.sum_contributions();
            if let Ok(mut slot) = self.shared.outcome.lock() {
                *slot = Some(outcome);
            }
        }
        self.shared.barrier.wait();
        staged?;

        let outcome = self.shared.outcome.lock().map_err(poisoned)?.clone();
        match outcome {
            Some(Ok(sum)) => {
                if self.rank == root {
                    data.copy_from_slice(&sum);
                }
                trace!("Rank {} finished reduction onto {root}", self.rank);
                Ok(())
            }
            Some(Err(reason)) => Err(Error::ReductionFailed(reason)),
            None => Err(Error::ReductionFailed("no outcome from root".to_string())),
        }
    }
}
