//! Step-by-step expansion of a [`DelayClickSequence`] into timed actions.
//!
//! [`Sequencer`] never sleeps. It hands out one [`Action`] at a time and the
//! caller decides how to wait, which keeps ordering testable without timers.
//! For every step the sequence is: `EnterStep` (carrying the step delay), then
//! `count` clicks separated by `Pace(interval)`. A pace also follows the last
//! click of a step unless the run is about to finish.

use std::time::Duration;

use config::DelayClickSequence;

/// How a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPolicy {
    /// Walk the steps once, then finish.
    OneShot,
    /// Wrap to the first step after the last, until cancelled.
    Cyclic,
}

/// Next thing a run must do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Enter step `index`; wait `delay` before its first click.
    EnterStep {
        /// Step index.
        index: usize,
        /// Delay before the first click.
        delay: Duration,
    },
    /// Fire one click for step `index`.
    Click {
        /// Step index.
        index: usize,
    },
    /// Wait one interval before continuing.
    Pace(Duration),
    /// A cyclic run wrapped from the last step to the first.
    CycleCompleted {
        /// Completed passes so far.
        cycles: u64,
    },
    /// A one-shot run has fired every click.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Enter,
    Click,
    Pace,
    Advance,
    Done,
}

/// Cursor over a sequence for one run.
#[derive(Debug, Clone)]
pub struct Sequencer {
    sequence: DelayClickSequence,
    interval: Duration,
    policy: RunPolicy,
    index: usize,
    remaining: u32,
    stage: Stage,
    cycles: u64,
    clicks: u64,
}

impl Sequencer {
    /// Start a run at step 0.
    pub fn new(sequence: DelayClickSequence, interval: Duration, policy: RunPolicy) -> Self {
        Self {
            sequence,
            interval,
            policy,
            index: 0,
            remaining: 0,
            stage: Stage::Enter,
            cycles: 0,
            clicks: 0,
        }
    }

    /// Interval between clicks within a step.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run policy.
    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    /// Index of the current step.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Clicks left in the current step.
    pub fn remaining_in_step(&self) -> u32 {
        self.remaining
    }

    /// Completed passes (cyclic runs only).
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Clicks handed out so far.
    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    /// True once a one-shot run has returned [`Action::Finished`].
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Produce the next action and advance the cursor.
    pub fn next_action(&mut self) -> Action {
        match self.stage {
            Stage::Enter => {
                let Some(step) = self.sequence.get(self.index) else {
                    return self.advance();
                };
                self.remaining = step.count();
                self.stage = if self.remaining > 0 {
                    Stage::Click
                } else {
                    Stage::Advance
                };
                Action::EnterStep {
                    index: self.index,
                    delay: Duration::from_millis(step.delay_ms()),
                }
            }
            Stage::Click => {
                self.remaining -= 1;
                self.clicks += 1;
                self.stage = Stage::Pace;
                Action::Click { index: self.index }
            }
            Stage::Pace => {
                if self.remaining == 0 {
                    if self.policy == RunPolicy::OneShot && self.is_last_step() {
                        return self.advance();
                    }
                    self.stage = Stage::Advance;
                } else {
                    self.stage = Stage::Click;
                }
                Action::Pace(self.interval)
            }
            Stage::Advance => self.advance(),
            Stage::Done => Action::Finished,
        }
    }

    fn is_last_step(&self) -> bool {
        self.index + 1 >= self.sequence.len()
    }

    fn advance(&mut self) -> Action {
        self.index += 1;
        if self.index < self.sequence.len() {
            self.stage = Stage::Enter;
            return self.next_action();
        }
        match self.policy {
            RunPolicy::OneShot => {
                self.stage = Stage::Done;
                Action::Finished
            }
            RunPolicy::Cyclic => {
                self.index = 0;
                self.cycles += 1;
                self.stage = Stage::Enter;
                Action::CycleCompleted {
                    cycles: self.cycles,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use config::DelayClickStep;

    use super::*;

    fn seq(steps: &[(u64, u32)]) -> DelayClickSequence {
        DelayClickSequence::new(
            steps
                .iter()
                .map(|&(d, c)| DelayClickStep::new(d, c))
                .collect(),
        )
        .expect("non-empty")
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn one_shot_emits_steps_in_order() {
        let mut s = Sequencer::new(seq(&[(0, 3), (10, 2)]), ms(5), RunPolicy::OneShot);
        let expected = vec![
            Action::EnterStep {
                index: 0,
                delay: ms(0),
            },
            Action::Click { index: 0 },
            Action::Pace(ms(5)),
            Action::Click { index: 0 },
            Action::Pace(ms(5)),
            Action::Click { index: 0 },
            Action::Pace(ms(5)),
            Action::EnterStep {
                index: 1,
                delay: ms(10),
            },
            Action::Click { index: 1 },
            Action::Pace(ms(5)),
            Action::Click { index: 1 },
            Action::Finished,
        ];
        let actual: Vec<Action> = (0..expected.len()).map(|_| s.next_action()).collect();
        assert_eq!(actual, expected);
        assert!(s.is_finished());
        assert_eq!(s.clicks(), 5);
        assert_eq!(s.next_action(), Action::Finished);
    }

    #[test]
    fn cyclic_wraps_and_counts_passes() {
        let mut s = Sequencer::new(seq(&[(0, 1)]), ms(20), RunPolicy::Cyclic);
        let actual: Vec<Action> = (0..9).map(|_| s.next_action()).collect();
        assert_eq!(
            actual,
            vec![
                Action::EnterStep {
                    index: 0,
                    delay: ms(0)
                },
                Action::Click { index: 0 },
                Action::Pace(ms(20)),
                Action::CycleCompleted { cycles: 1 },
                Action::EnterStep {
                    index: 0,
                    delay: ms(0)
                },
                Action::Click { index: 0 },
                Action::Pace(ms(20)),
                Action::CycleCompleted { cycles: 2 },
                Action::EnterStep {
                    index: 0,
                    delay: ms(0)
                },
            ]
        );
        assert!(!s.is_finished());
        assert_eq!(s.cycles(), 2);
    }

    #[test]
    fn clicks_per_pass_match_plan_total() {
        let plan = seq(&[(5, 4), (0, 1), (7, 3)]);
        let total = plan.total_clicks();
        let mut s = Sequencer::new(plan, ms(1), RunPolicy::Cyclic);
        let mut clicks = 0;
        loop {
            match s.next_action() {
                Action::Click { .. } => clicks += 1,
                Action::CycleCompleted { .. } => break,
                _ => {}
            }
        }
        assert_eq!(clicks, total);
    }

    #[test]
    fn next_step_only_after_previous_clicks() {
        let mut s = Sequencer::new(seq(&[(0, 2), (0, 2), (0, 1)]), ms(1), RunPolicy::OneShot);
        let mut per_step = [0u32; 3];
        let mut current = None;
        loop {
            match s.next_action() {
                Action::EnterStep { index, .. } => {
                    if let Some(prev) = current {
                        assert_eq!(per_step[prev], [2, 2, 1][prev]);
                    }
                    current = Some(index);
                }
                Action::Click { index } => per_step[index] += 1,
                Action::Finished => break,
                _ => {}
            }
        }
        assert_eq!(per_step, [2, 2, 1]);
    }
}
