use std::collections::VecDeque;

use crate::core::levels::{Level, LevelDetector};
use crate::core::retest::{Phase, RetestConfig, RetestMachine, StepOutcome};
use crate::error::StrategyError;
use crate::models::Candle;

/// Detector + state machine for a single pair, fed one closed candle at a time.
///
/// Holds at most `lookback + 1` candles. Each pair needs its own instance.
pub struct BreakoutRetestStrategy {
    detector: LevelDetector,
    machine: RetestMachine,
    window: VecDeque<Candle>,
}

impl BreakoutRetestStrategy {
    pub fn new(lookback: usize, config: RetestConfig) -> Result<Self, StrategyError> {
        let detector = LevelDetector::new(lookback)?;
        let machine = RetestMachine::new(config)?;
        Ok(Self {
            window: VecDeque::with_capacity(detector.window_len() + 1),
            detector,
            machine,
        })
    }

    pub fn machine(&self) -> &RetestMachine {
        &self.machine
    }

    pub fn phase(&self) -> &Phase {
        self.machine.phase()
    }

    pub fn active_level(&self) -> Option<&Level> {
        self.detector.active()
    }

    /// True once enough history is buffered for breakouts to be evaluated.
    pub fn is_warm(&self) -> bool {
        self.window.len() >= self.detector.window_len()
    }

    /// Push a closed candle through detector and state machine.
    ///
    /// A rejected candle leaves the window, detector and machine untouched.
    pub fn on_candle(&mut self, candle: Candle) -> Result<StepOutcome, StrategyError> {
        self.machine.validate(&candle)?;

        let detector = self.detector.clone();
        self.window.push_back(candle);
        let evicted = if self.window.len() > self.detector.window_len() {
            self.window.pop_front()
        } else {
            None
        };

        match self.advance() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.window.pop_back();
                if let Some(c) = evicted {
                    self.window.push_front(c);
                }
                self.detector = detector;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<StepOutcome, StrategyError> {
        let fresh_break = match self.detector.refresh(self.window.make_contiguous()) {
            Ok(level) => level,
            Err(StrategyError::InsufficientData { .. }) => None,
            Err(e) => return Err(e),
        };

        let latest = match self.window.back() {
            Some(c) => c,
            None => return Ok(StepOutcome::Idle),
        };
        self.machine.step(latest, fresh_break.as_ref())
    }
}
