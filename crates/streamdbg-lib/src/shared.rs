//! Single-writer handle for sharing a compactor across threads
//!
//! Updates take the write lock for their whole duration, so readers (report
//! snapshots, walks, component analysis) only ever observe the graph between
//! two complete updates.

use crate::cdbg::ComponentReport;
use crate::compactor::{StreamingCompactor, UpdateSummary};
use crate::error::Result;
use crate::kmer::KmerHasher;
use crate::report::Report;
use crate::store::KmerStore;
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Cloneable handle on a compactor guarded by a reader-writer lock
pub struct SharedCompactor<S: KmerStore, H: KmerHasher> {
    inner: Arc<RwLock<StreamingCompactor<S, H>>>,
}

impl<S: KmerStore, H: KmerHasher> Clone for SharedCompactor<S, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KmerStore, H: KmerHasher> SharedCompactor<S, H> {
    /// Wrap a compactor
    pub fn new(compactor: StreamingCompactor<S, H>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(compactor)),
        }
    }

    /// Apply one sequence under the write lock
    pub fn update(&self, sequence: &[u8]) -> Result<UpdateSummary> {
        self.inner.write().update(sequence)
    }

    /// Run a read-only closure under the read lock
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&StreamingCompactor<S, H>) -> R,
    {
        f(&self.inner.read())
    }

    /// Copy of the current report
    pub fn report(&self) -> Report {
        let inner = self.inner.read();
        Report::from_compactor(&*inner)
    }

    /// Recover the compactor once no other handle is alive
    pub fn try_unwrap(self) -> std::result::Result<StreamingCompactor<S, H>, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<S, H> SharedCompactor<S, H>
where
    S: KmerStore + 'static,
    H: KmerHasher + 'static,
{
    /// Run component analysis on a background thread
    ///
    /// The read lock is held for the whole analysis, so updates issued in
    /// the meantime wait for it to finish.
    pub fn spawn_component_analysis(&self) -> JoinHandle<Result<ComponentReport>> {
        let handle = self.clone();
        std::thread::spawn(move || handle.read(|c| c.find_connected_components()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompactorConfig;
    use crate::kmer::ForwardHasher;
    use crate::store::ExactStore;

    fn shared() -> SharedCompactor<ExactStore, ForwardHasher> {
        let config = CompactorConfig {
            k: 4,
            canonical: false,
            num_threads: 1,
            component_sample_size: 0,
            ..CompactorConfig::default()
        };
        SharedCompactor::new(
            StreamingCompactor::with_parts(config, ExactStore::new(), ForwardHasher::new(4)).unwrap(),
        )
    }

    #[test]
    fn test_updates_from_several_threads() {
        let handle = shared();
        let workers: Vec<_> = [&b"TTAACGTC"[..], b"AACGA", b"GGATTCAGC"]
            .into_iter()
            .map(|seq| {
                let h = handle.clone();
                std::thread::spawn(move || h.update(seq).map(|_| ()))
            })
            .collect();
        for w in workers {
            w.join().unwrap().unwrap();
        }
        let report = handle.report();
        assert_eq!(report.n_updates, 3);
        assert_eq!(report.n_dnodes, 1);
        assert_eq!(report.n_unodes, 4);
    }

    #[test]
    fn test_background_component_analysis() {
        let handle = shared();
        handle.update(b"TTAACGTC").unwrap();
        handle.update(b"AACGA").unwrap();
        let components = handle.spawn_component_analysis().join().unwrap().unwrap();
        assert_eq!(components.n_components, 1);
        assert_eq!(components.sizes, vec![4]);

        let n = handle.read(|c| c.cdbg().n_unodes());
        assert_eq!(n, 3);
        assert!(handle.try_unwrap().is_ok());
    }
}
