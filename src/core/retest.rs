use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::levels::Level;
use crate::core::orders::{compute_order, RISK_REWARD_RATIO};
use crate::error::StrategyError;
use crate::models::{Candle, Direction};
use crate::strategies::signals::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetestConfig {
    /// Fractional band around the broken level that still counts as a retest.
    pub retest_tolerance: f64,
    /// Candles a phase may wait for its next transition before the pattern expires.
    pub max_wait_candles: usize,
    pub stop_loss_percent: f64,
    pub allow_shorts: bool,
}

impl RetestConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !self.retest_tolerance.is_finite()
            || self.retest_tolerance <= 0.0
            || self.retest_tolerance >= 1.0
        {
            return Err(StrategyError::InvalidParameter {
                name: "retest_tolerance",
                value: self.retest_tolerance,
                reason: "must be a fraction between 0 and 1",
            });
        }
        if self.max_wait_candles == 0 {
            return Err(StrategyError::InvalidParameter {
                name: "max_wait_candles",
                value: 0.0,
                reason: "must be at least one candle",
            });
        }
        if !self.stop_loss_percent.is_finite()
            || self.stop_loss_percent <= 0.0
            || self.stop_loss_percent >= 1.0
        {
            return Err(StrategyError::InvalidParameter {
                name: "stop_loss_percent",
                value: self.stop_loss_percent,
                reason: "must be a fraction between 0 and 1",
            });
        }
        // A short's take-profit sits RISK_REWARD_RATIO stops below entry.
        if self.allow_shorts && self.stop_loss_percent * RISK_REWARD_RATIO >= 1.0 {
            return Err(StrategyError::InvalidParameter {
                name: "stop_loss_percent",
                value: self.stop_loss_percent,
                reason: "too wide for shorts, take-profit would be non-positive",
            });
        }
        Ok(())
    }
}

/// Data carried into the `Confirmed` phase. Only built when a retesting
/// pattern resumes in the breakout direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    level: Level,
    direction: Direction,
    entry: f64,
    confirmed_at: DateTime<Utc>,
}

impl Confirmation {
    fn into_signal(self, stop_loss_percent: f64) -> Result<Signal, StrategyError> {
        let order = compute_order(self.direction, self.entry, stop_loss_percent)?;
        Ok(Signal::new(self.direction, order, self.level, self.confirmed_at))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Broken {
        level: Level,
        direction: Direction,
        breakout_close: f64,
        candles_waited: usize,
    },
    Retesting {
        level: Level,
        direction: Direction,
        breakout_close: f64,
        /// Deepest wick back toward the level so far.
        touch: f64,
        candles_waited: usize,
    },
    Confirmed(Confirmation),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Broken { .. } => "broken",
            Phase::Retesting { .. } => "retesting",
            Phase::Confirmed(_) => "confirmed",
        }
    }

    pub fn level(&self) -> Option<&Level> {
        match self {
            Phase::Idle => None,
            Phase::Broken { level, .. } | Phase::Retesting { level, .. } => Some(level),
            Phase::Confirmed(c) => Some(&c.level),
        }
    }
}

/// Everything the machine remembers between candles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetestState {
    phase: Phase,
    last_timestamp: Option<DateTime<Utc>>,
}

impl RetestState {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }
}

/// What a single candle did to the pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Nothing in progress and no usable break.
    Idle,
    BreakoutDetected(Level),
    RetestTouched { level: Level, touch: f64 },
    Waiting { phase: &'static str, candles_waited: usize },
    /// Price closed back through the level beyond the tolerance band.
    Invalidated { level: Level, close: f64 },
    /// No transition within `max_wait_candles`.
    Expired { level: Level, phase: &'static str },
    Confirmed(Signal),
}

/// Breakout → retest → confirmation tracker for one trading pair.
#[derive(Debug, Clone)]
pub struct RetestMachine {
    config: RetestConfig,
    state: RetestState,
}

impl RetestMachine {
    pub fn new(config: RetestConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RetestState::default(),
        })
    }

    pub fn config(&self) -> &RetestConfig {
        &self.config
    }

    pub fn state(&self) -> &RetestState {
        &self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.state.phase
    }

    /// Price sanity plus strict timestamp ordering against the last accepted candle.
    pub fn validate(&self, candle: &Candle) -> Result<(), StrategyError> {
        candle.validate()?;
        if let Some(last) = self.state.last_timestamp {
            if candle.timestamp <= last {
                return Err(StrategyError::invalid_candle(
                    candle.timestamp,
                    format!("not after previous candle at {}", last),
                ));
            }
        }
        Ok(())
    }

    /// Advance by one closed candle. `fresh_break` is the level the detector
    /// reported as broken by this same candle, if any.
    ///
    /// On error the state is untouched.
    pub fn step(
        &mut self,
        candle: &Candle,
        fresh_break: Option<&Level>,
    ) -> Result<StepOutcome, StrategyError> {
        self.validate(candle)?;

        let (next, outcome) = self.transition(candle, fresh_break);
        let (next, outcome) = match next {
            Phase::Confirmed(confirmation) => {
                let signal = confirmation.into_signal(self.config.stop_loss_percent)?;
                (Phase::Idle, StepOutcome::Confirmed(signal))
            }
            other => (other, outcome),
        };

        self.state = RetestState {
            phase: next,
            last_timestamp: Some(candle.timestamp),
        };
        Ok(outcome)
    }

    /// Drop any pattern in progress. Candle ordering is kept.
    pub fn reset(&mut self) {
        self.state.phase = Phase::Idle;
    }

    fn transition(&self, candle: &Candle, fresh_break: Option<&Level>) -> (Phase, StepOutcome) {
        let tolerance = self.config.retest_tolerance;
        let max_wait = self.config.max_wait_candles;

        match &self.state.phase {
            Phase::Idle | Phase::Confirmed(_) => self.start(candle, fresh_break),

            Phase::Broken {
                level,
                direction,
                breakout_close,
                candles_waited,
            } => {
                if closed_through(*direction, candle.close, level.price, tolerance) {
                    return invalidated(level, candle.close);
                }
                if touched(*direction, candle, level.price, tolerance) {
                    let touch = wick_toward_level(*direction, candle);
                    return (
                        Phase::Retesting {
                            level: *level,
                            direction: *direction,
                            breakout_close: *breakout_close,
                            touch,
                            candles_waited: 0,
                        },
                        StepOutcome::RetestTouched {
                            level: *level,
                            touch,
                        },
                    );
                }
                let waited = candles_waited + 1;
                if waited >= max_wait {
                    return expired(level, "broken");
                }
                (
                    Phase::Broken {
                        level: *level,
                        direction: *direction,
                        breakout_close: *breakout_close,
                        candles_waited: waited,
                    },
                    StepOutcome::Waiting {
                        phase: "broken",
                        candles_waited: waited,
                    },
                )
            }

            Phase::Retesting {
                level,
                direction,
                breakout_close,
                touch,
                candles_waited,
            } => {
                if closed_through(*direction, candle.close, level.price, tolerance) {
                    return invalidated(level, candle.close);
                }
                if resumed(*direction, candle.close, level.price) {
                    let confirmation = Confirmation {
                        level: *level,
                        direction: *direction,
                        entry: candle.close,
                        confirmed_at: candle.timestamp,
                    };
                    // Outcome is replaced with the signal once orders are priced.
                    return (Phase::Confirmed(confirmation), StepOutcome::Idle);
                }
                let waited = candles_waited + 1;
                if waited >= max_wait {
                    return expired(level, "retesting");
                }
                let touch = match direction {
                    Direction::Long => touch.min(candle.low),
                    Direction::Short => touch.max(candle.high),
                };
                (
                    Phase::Retesting {
                        level: *level,
                        direction: *direction,
                        breakout_close: *breakout_close,
                        touch,
                        candles_waited: waited,
                    },
                    StepOutcome::Waiting {
                        phase: "retesting",
                        candles_waited: waited,
                    },
                )
            }
        }
    }

    fn start(&self, candle: &Candle, fresh_break: Option<&Level>) -> (Phase, StepOutcome) {
        let level = match fresh_break {
            Some(level) => level,
            None => return (Phase::Idle, StepOutcome::Idle),
        };
        let direction = match level.direction.to_direction() {
            Some(Direction::Short) if !self.config.allow_shorts => {
                return (Phase::Idle, StepOutcome::Idle);
            }
            Some(direction) => direction,
            None => return (Phase::Idle, StepOutcome::Idle),
        };
        (
            Phase::Broken {
                level: *level,
                direction,
                breakout_close: candle.close,
                candles_waited: 0,
            },
            StepOutcome::BreakoutDetected(*level),
        )
    }
}

fn invalidated(level: &Level, close: f64) -> (Phase, StepOutcome) {
    (
        Phase::Idle,
        StepOutcome::Invalidated {
            level: *level,
            close,
        },
    )
}

fn expired(level: &Level, phase: &'static str) -> (Phase, StepOutcome) {
    (
        Phase::Idle,
        StepOutcome::Expired {
            level: *level,
            phase,
        },
    )
}

/// Wick reached back into the band on the breakout side.
fn touched(direction: Direction, candle: &Candle, level: f64, tolerance: f64) -> bool {
    match direction {
        Direction::Long => candle.low <= level * (1.0 + tolerance),
        Direction::Short => candle.high >= level * (1.0 - tolerance),
    }
}

/// Close landed on the wrong side of the level, past the band.
fn closed_through(direction: Direction, close: f64, level: f64, tolerance: f64) -> bool {
    match direction {
        Direction::Long => close < level * (1.0 - tolerance),
        Direction::Short => close > level * (1.0 + tolerance),
    }
}

fn resumed(direction: Direction, close: f64, level: f64) -> bool {
    match direction {
        Direction::Long => close > level,
        Direction::Short => close < level,
    }
}

fn wick_toward_level(direction: Direction, candle: &Candle) -> f64 {
    match direction {
        Direction::Long => candle.low,
        Direction::Short => candle.high,
    }
}
