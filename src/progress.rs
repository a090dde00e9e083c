use std::sync::Mutex;

/// Characters cycled by the spinner, one step per change of the current
/// value.
const SPINNER: [char; 4] = ['\\', '|', '/', '-'];

/// A mutable progress gauge with a printable spinner symbol.
///
/// Workload drivers share one indicator between all progress callbacks;
/// the callbacks feed it via [`update_current`](ProgressIndicator::update_current)
/// and [`update_final`](ProgressIndicator::update_final) and the driver
/// renders [`percentage`](ProgressIndicator::percentage) and
/// [`symbol`](ProgressIndicator::symbol) into its held status line.
#[derive(Debug, Default)]
pub struct ProgressIndicator {
    state: Mutex<ProgressState>,
}

#[derive(Debug, Default)]
struct ProgressState {
    current: f64,
    final_value: f64,
    step: usize,
}

impl ProgressIndicator {
    /// Create an indicator with the given final value and zero progress.
    pub fn new(final_value: f64) -> ProgressIndicator {
        ProgressIndicator {
            state: Mutex::new(ProgressState {
                current: 0.0,
                final_value,
                step: 0,
            }),
        }
    }

    /// Update the current value, advancing the spinner when it changed.
    pub fn update_current(&self, value: f64) {
        let mut state = self.state.lock().unwrap();
        if value != state.current {
            state.current = value;
            state.step = (state.step + 1) % SPINNER.len();
        }
    }

    /// Update the final value.
    pub fn update_final(&self, value: f64) {
        self.state.lock().unwrap().final_value = value;
    }

    /// The completed percentage, clamped to `[0, 100]`; zero while the
    /// final value is not positive.
    pub fn percentage(&self) -> u32 {
        let state = self.state.lock().unwrap();
        if state.final_value <= 0.0 {
            return 0;
        }
        let ratio = (state.current / state.final_value).clamp(0.0, 1.0);
        (ratio * 100.0).round() as u32
    }

    /// The current spinner symbol.
    pub fn symbol(&self) -> char {
        SPINNER[self.state.lock().unwrap().step]
    }
}
