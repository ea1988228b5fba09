use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::lock;

/// Per-dataset state as shown in the downloads panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Renderer view of the tracker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadStatus {
    pub datasets: Vec<(String, DatasetState)>,
    pub required_met: bool,
}

impl DownloadStatus {
    /// Whether the panel has anything worth showing.
    pub fn is_relevant(&self) -> bool {
        self.datasets
            .iter()
            .any(|(_, s)| *s != DatasetState::Pending)
    }
}

#[derive(Debug, Default)]
struct Sets {
    in_progress: BTreeSet<String>,
    completed: BTreeSet<String>,
    failed: BTreeSet<String>,
}

/// Which datasets are downloading / downloaded in the current cycle.
///
/// `in_progress` and `completed` stay disjoint: `finish` moves a name
/// between them under a single lock.
#[derive(Debug, Clone)]
pub struct DownloadTracker {
    sets: Arc<Mutex<Sets>>,
    order: Arc<Vec<String>>,
    required: Arc<BTreeSet<String>>,
}

impl DownloadTracker {
    pub fn new(datasets: Vec<String>, required: Vec<String>) -> Self {
        Self {
            sets: Arc::new(Mutex::new(Sets::default())),
            order: Arc::new(datasets),
            required: Arc::new(required.into_iter().collect()),
        }
    }

    /// Mark `name` as downloading. Returns `false` if it is already
    /// completed or in progress this cycle.
    pub fn start(&self, name: &str) -> bool {
        let mut sets = lock(&self.sets);
        if sets.completed.contains(name) || sets.in_progress.contains(name) {
            return false;
        }
        sets.failed.remove(name);
        sets.in_progress.insert(name.to_string());
        true
    }

    /// Move `name` from in-progress to completed.
    pub fn finish(&self, name: &str) {
        let mut sets = lock(&self.sets);
        sets.in_progress.remove(name);
        sets.completed.insert(name.to_string());
    }

    /// Drop `name` from in-progress after a failed or cancelled download.
    pub fn abandon(&self, name: &str, failed: bool) {
        let mut sets = lock(&self.sets);
        sets.in_progress.remove(name);
        if failed {
            sets.failed.insert(name.to_string());
        }
    }

    /// Mark every in-progress download as failed.
    pub fn fail_in_progress(&self) {
        let mut sets = lock(&self.sets);
        let names = std::mem::take(&mut sets.in_progress);
        sets.failed.extend(names);
    }

    #[cfg(test)]
    pub fn is_completed(&self, name: &str) -> bool {
        lock(&self.sets).completed.contains(name)
    }

    pub fn all_required_completed(&self) -> bool {
        let sets = lock(&self.sets);
        self.required.iter().all(|r| sets.completed.contains(r))
    }

    /// Start a fresh cycle: forget everything downloaded so far.
    pub fn new_cycle(&self) {
        *lock(&self.sets) = Sets::default();
    }

    pub fn status(&self) -> DownloadStatus {
        let sets = lock(&self.sets);
        let datasets = self
            .order
            .iter()
            .map(|name| {
                let state = if sets.completed.contains(name) {
                    DatasetState::Completed
                } else if sets.in_progress.contains(name) {
                    DatasetState::InProgress
                } else if sets.failed.contains(name) {
                    DatasetState::Failed
                } else {
                    DatasetState::Pending
                };
                (name.clone(), state)
            })
            .collect();
        let required_met = self.required.iter().all(|r| sets.completed.contains(r));
        DownloadStatus {
            datasets,
            required_met,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tracker() -> DownloadTracker {
        let names: Vec<String> = ["train", "validation", "live"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        DownloadTracker::new(names.clone(), names)
    }

    #[test]
    fn start_finish_moves_between_sets() {
        let t = make_tracker();
        assert!(t.start("train"));
        assert!(!t.is_completed("train"));
        t.finish("train");
        assert!(t.is_completed("train"));
        let status = t.status();
        assert_eq!(status.datasets[0].1, DatasetState::Completed);
        assert_eq!(status.datasets[1].1, DatasetState::Pending);
    }

    #[test]
    fn start_twice_is_refused() {
        let t = make_tracker();
        assert!(t.start("live"));
        assert!(!t.start("live"));
        t.finish("live");
        assert!(!t.start("live"));
    }

    #[test]
    fn required_completion() {
        let t = make_tracker();
        for name in ["train", "validation"] {
            t.start(name);
            t.finish(name);
        }
        assert!(!t.all_required_completed());
        t.start("live");
        t.finish("live");
        assert!(t.all_required_completed());
        assert!(t.status().required_met);
    }

    #[test]
    fn required_subset() {
        let t = DownloadTracker::new(
            vec!["train".into(), "live".into()],
            vec!["live".into()],
        );
        t.start("live");
        t.finish("live");
        assert!(t.all_required_completed());
    }

    #[test]
    fn abandon_marks_failed_and_allows_retry() {
        let t = make_tracker();
        t.start("validation");
        t.abandon("validation", true);
        assert_eq!(t.status().datasets[1].1, DatasetState::Failed);
        assert!(t.start("validation"));
        assert_eq!(t.status().datasets[1].1, DatasetState::InProgress);
    }

    #[test]
    fn new_cycle_clears() {
        let t = make_tracker();
        t.start("train");
        t.finish("train");
        t.new_cycle();
        assert!(!t.is_completed("train"));
        assert!(!t.status().is_relevant());
    }

    #[test]
    fn in_progress_and_completed_stay_disjoint_under_contention() {
        let t = make_tracker();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = t.clone();
                std::thread::spawn(move || {
                    if t.start("train") {
                        t.finish("train");
                        1
                    } else {
                        0
                    }
                })
            })
            .collect();
        let started: i32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(started, 1);
        assert_eq!(t.status().datasets[0].1, DatasetState::Completed);
    }

    #[test]
    fn fail_in_progress_moves_to_failed() {
        let t = make_tracker();
        t.start("train");
        t.finish("train");
        t.start("validation");
        t.fail_in_progress();
        let status = t.status();
        assert_eq!(status.datasets[0].1, DatasetState::Completed);
        assert_eq!(status.datasets[1].1, DatasetState::Failed);
        assert!(t.start("validation"));
    }
}
