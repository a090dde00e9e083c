use std::sync::Mutex;

/// Thread-safe accounting of a workload's elements across the three
/// stages of their life: waiting, processing and completed.
///
/// Elements only ever move forward: new elements are added to waiting,
/// then moved waiting → processing and processing → completed. All
/// readers and mutators take the single internal mutex, so every observed
/// triple is a consistent snapshot.
#[derive(Debug, Default)]
pub struct WorkloadAdvancement {
    counts: Mutex<Counts>,
}

#[derive(Debug, Default)]
struct Counts {
    waiting: usize,
    processing: usize,
    completed: usize,
}

impl WorkloadAdvancement {
    /// Create an advancement seeded with `initial_waiting` waiting
    /// elements.
    pub fn new(initial_waiting: usize) -> WorkloadAdvancement {
        WorkloadAdvancement {
            counts: Mutex::new(Counts {
                waiting: initial_waiting,
                processing: 0,
                completed: 0,
            }),
        }
    }

    /// The elements waiting to be processed.
    pub fn waiting(&self) -> usize {
        self.counts.lock().unwrap().waiting
    }

    /// The elements under processing.
    pub fn processing(&self) -> usize {
        self.counts.lock().unwrap().processing
    }

    /// The completed elements.
    pub fn completed(&self) -> usize {
        self.counts.lock().unwrap().completed
    }

    /// All elements, i.e. the sum of waiting, processing and completed.
    pub fn total(&self) -> usize {
        let counts = self.counts.lock().unwrap();
        counts.waiting + counts.processing + counts.completed
    }

    /// Add `n` elements to waiting.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn add_to_waiting(&self, n: usize) {
        assert!(n > 0, "must add at least one waiting element");
        self.counts.lock().unwrap().waiting += n;
    }

    /// Move `n` elements from waiting to processing.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` elements are waiting.
    pub fn add_to_processing(&self, n: usize) {
        let mut counts = self.counts.lock().unwrap();
        assert!(
            n <= counts.waiting,
            "cannot move more elements to processing than are waiting"
        );
        counts.waiting -= n;
        counts.processing += n;
    }

    /// Move `n` elements from processing to completed.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` elements are processing.
    pub fn add_to_completed(&self, n: usize) {
        let mut counts = self.counts.lock().unwrap();
        assert!(
            n <= counts.processing,
            "cannot complete more elements than are processing"
        );
        counts.processing -= n;
        counts.completed += n;
    }

    /// The rate of completion in `[0, 1]`, or zero while no elements have
    /// been added.
    pub fn completion_rate(&self) -> f64 {
        let counts = self.counts.lock().unwrap();
        let total = counts.waiting + counts.processing + counts.completed;
        if total == 0 {
            0.0
        } else {
            counts.completed as f64 / total as f64
        }
    }

    /// Whether no processing remains, i.e. waiting and processing are both
    /// zero. True in the initial default state.
    pub fn has_finished(&self) -> bool {
        let counts = self.counts.lock().unwrap();
        counts.waiting == 0 && counts.processing == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let advancement = WorkloadAdvancement::default();
        assert_eq!(advancement.waiting(), 0);
        assert_eq!(advancement.processing(), 0);
        assert_eq!(advancement.completed(), 0);
        assert_eq!(advancement.total(), 0);
        assert_eq!(advancement.completion_rate(), 0.0);
        assert!(advancement.has_finished());
    }

    #[test]
    fn seeded_state() {
        let advancement = WorkloadAdvancement::new(3);
        assert_eq!(advancement.waiting(), 3);
        assert_eq!(advancement.total(), 3);
        assert!(!advancement.has_finished());
    }

    #[test]
    fn full_transition_cycle() {
        let advancement = WorkloadAdvancement::default();
        advancement.add_to_waiting(4);
        assert_eq!(advancement.waiting(), 4);
        assert!(!advancement.has_finished());

        advancement.add_to_processing(2);
        assert_eq!(advancement.waiting(), 2);
        assert_eq!(advancement.processing(), 2);

        advancement.add_to_completed(2);
        assert_eq!(advancement.processing(), 0);
        assert_eq!(advancement.completed(), 2);
        assert_eq!(advancement.completion_rate(), 0.5);
        assert!(!advancement.has_finished());

        advancement.add_to_processing(2);
        advancement.add_to_completed(2);
        assert_eq!(advancement.completed(), 4);
        assert_eq!(advancement.completion_rate(), 1.0);
        assert!(advancement.has_finished());
    }

    #[test]
    fn total_is_conserved() {
        let advancement = WorkloadAdvancement::new(5);
        advancement.add_to_waiting(3);
        advancement.add_to_processing(6);
        advancement.add_to_completed(4);
        assert_eq!(advancement.total(), 8);
    }

    #[test]
    #[should_panic(expected = "at least one waiting element")]
    fn add_zero_to_waiting() {
        WorkloadAdvancement::default().add_to_waiting(0);
    }

    #[test]
    #[should_panic(expected = "more elements to processing than are waiting")]
    fn overdraw_waiting() {
        let advancement = WorkloadAdvancement::new(1);
        advancement.add_to_processing(2);
    }

    #[test]
    #[should_panic(expected = "more elements than are processing")]
    fn overdraw_processing() {
        let advancement = WorkloadAdvancement::new(2);
        advancement.add_to_processing(1);
        advancement.add_to_completed(2);
    }
}
