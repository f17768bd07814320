// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Playback scheduling.
//!
//! [`PlaybackScheduler`] is a clock-free state machine. Each call returns the
//! visibility changes to apply and what to do with the single outstanding
//! timer; the caller owns the actual timer and the layers.
//!
//! ```text
//! Idle --load(non-empty)--> Priming --fire--> Playing --fire--> Playing ...
//!   ^                          |                 |
//!   +------load(empty)---------+-----------------+
//! ```

use std::time::Duration;

/// Delay between frames.
pub const DEFAULT_ANIMATION_SPEED: Duration = Duration::from_millis(600);
/// Fade-in time of the display. Playback starts after twice this.
pub const DEFAULT_FADE_IN: Duration = Duration::from_millis(2000);
/// Extra hold on the last frame before the sequence wraps.
pub const DEFAULT_BOUNDARY_PAUSE: Duration = Duration::from_millis(2000);
/// Opacity of the visible frame.
pub const DEFAULT_VISIBLE_OPACITY: f32 = 0.65;

/// Playback timing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Delay between frames.
    pub animation_speed: Duration,
    /// Fade-in duration of the display.
    pub fade_in: Duration,
    /// Extra hold on the last frame.
    pub boundary_pause: Duration,
    /// Opacity applied to the visible frame.
    pub visible_opacity: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            animation_speed: DEFAULT_ANIMATION_SPEED,
            fade_in: DEFAULT_FADE_IN,
            boundary_pause: DEFAULT_BOUNDARY_PAUSE,
            visible_opacity: DEFAULT_VISIBLE_OPACITY,
        }
    }
}

impl PlaybackConfig {
    /// Time between loading a sequence and showing its first frame.
    #[must_use]
    pub fn priming_delay(&self) -> Duration {
        self.fade_in * 2
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No frames loaded.
    Idle,
    /// Frames loaded, waiting for the display to settle before the first frame.
    Priming,
    /// Looping through frames.
    Playing,
}

/// A visibility change the caller must apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisibilityCommand {
    Show { timestamp: i64, opacity: f32 },
    Hide { timestamp: i64 },
}

/// What to do with the scheduler's single outstanding timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    /// Replace any outstanding timer with one firing after the delay.
    Arm(Duration),
    /// Cancel the outstanding timer.
    Cancel,
}

/// Result of a timer firing.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub commands: Vec<VisibilityCommand>,
    pub timer: TimerDirective,
}

/// Steps through an ordered sequence of frame timestamps.
#[derive(Debug)]
pub struct PlaybackScheduler {
    config: PlaybackConfig,
    sequence: Vec<i64>,
    position: usize,
    phase: PlaybackPhase,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

impl PlaybackScheduler {
    #[must_use]
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            sequence: Vec::new(),
            position: 0,
            phase: PlaybackPhase::Idle,
        }
    }

    /// Replace the sequence and restart from the first frame.
    ///
    /// Any timer outstanding for the previous sequence is superseded by the
    /// returned directive.
    pub fn load(&mut self, timestamps: Vec<i64>) -> TimerDirective {
        self.sequence = timestamps;
        self.position = 0;

        if self.sequence.is_empty() {
            self.phase = PlaybackPhase::Idle;
            TimerDirective::Cancel
        } else {
            self.phase = PlaybackPhase::Priming;
            TimerDirective::Arm(self.config.priming_delay())
        }
    }

    /// Advance the state machine because the outstanding timer fired.
    pub fn fire(&mut self) -> Step {
        match self.phase {
            PlaybackPhase::Idle => Step {
                commands: Vec::new(),
                timer: TimerDirective::Cancel,
            },
            PlaybackPhase::Priming => {
                self.phase = PlaybackPhase::Playing;
                Step {
                    commands: vec![self.show(self.position)],
                    timer: TimerDirective::Arm(self.hold_for(self.position)),
                }
            }
            PlaybackPhase::Playing => self.tick(),
        }
    }

    fn tick(&mut self) -> Step {
        let next = (self.position + 1) % self.sequence.len();

        // A single-frame sequence stays visible instead of hide-then-show.
        let commands = if next == self.position {
            Vec::new()
        } else {
            vec![
                VisibilityCommand::Hide {
                    timestamp: self.sequence[self.position],
                },
                self.show(next),
            ]
        };

        self.position = next;

        Step {
            commands,
            timer: TimerDirective::Arm(self.hold_for(next)),
        }
    }

    fn show(&self, index: usize) -> VisibilityCommand {
        VisibilityCommand::Show {
            timestamp: self.sequence[index],
            opacity: self.config.visible_opacity,
        }
    }

    /// How long the frame at `index` stays on screen. The last frame is held
    /// for an extra boundary pause before the loop wraps.
    fn hold_for(&self, index: usize) -> Duration {
        if index + 1 == self.sequence.len() {
            self.config.animation_speed + self.config.boundary_pause
        } else {
            self.config.animation_speed
        }
    }

    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Timestamp at the current position, if any frames are loaded.
    #[must_use]
    pub fn current(&self) -> Option<i64> {
        self.sequence.get(self.position).copied()
    }

    #[must_use]
    pub fn sequence(&self) -> &[i64] {
        &self.sequence
    }

    #[must_use]
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEED: Duration = DEFAULT_ANIMATION_SPEED;
    const HOLD: Duration = Duration::from_millis(2600);

    fn playing(timestamps: Vec<i64>) -> (PlaybackScheduler, Step) {
        let mut scheduler = PlaybackScheduler::default();
        scheduler.load(timestamps);
        let step = scheduler.fire();
        (scheduler, step)
    }

    #[test]
    fn test_load_primes_for_twice_fade_in() {
        let mut scheduler = PlaybackScheduler::default();
        let directive = scheduler.load(vec![100, 200]);
        assert_eq!(directive, TimerDirective::Arm(Duration::from_millis(4000)));
        assert_eq!(scheduler.phase(), PlaybackPhase::Priming);
        assert_eq!(scheduler.position(), 0);
    }

    #[test]
    fn test_load_empty_goes_idle() {
        let (mut scheduler, _) = playing(vec![100, 200]);
        assert_eq!(scheduler.load(Vec::new()), TimerDirective::Cancel);
        assert_eq!(scheduler.phase(), PlaybackPhase::Idle);
        assert!(scheduler.current().is_none());
        assert_eq!(
            scheduler.fire(),
            Step {
                commands: Vec::new(),
                timer: TimerDirective::Cancel
            }
        );
    }

    #[test]
    fn test_priming_shows_first_frame() {
        let (scheduler, step) = playing(vec![100, 200, 300]);
        assert_eq!(scheduler.phase(), PlaybackPhase::Playing);
        assert_eq!(
            step.commands,
            vec![VisibilityCommand::Show {
                timestamp: 100,
                opacity: 0.65
            }]
        );
        assert_eq!(step.timer, TimerDirective::Arm(SPEED));
    }

    #[test]
    fn test_tick_hides_current_and_shows_next() {
        let (mut scheduler, _) = playing(vec![100, 200, 300]);
        let step = scheduler.fire();
        assert_eq!(
            step.commands,
            vec![
                VisibilityCommand::Hide { timestamp: 100 },
                VisibilityCommand::Show {
                    timestamp: 200,
                    opacity: 0.65
                },
            ]
        );
        assert_eq!(scheduler.position(), 1);
    }

    #[test]
    fn test_last_frame_is_held_longer() {
        let (mut scheduler, _) = playing(vec![1, 2, 3, 4]);
        let holds: Vec<_> = (0..8).map(|_| scheduler.fire().timer).collect();
        assert_eq!(
            holds,
            vec![
                TimerDirective::Arm(SPEED),
                TimerDirective::Arm(SPEED),
                TimerDirective::Arm(HOLD),
                TimerDirective::Arm(SPEED),
                TimerDirective::Arm(SPEED),
                TimerDirective::Arm(SPEED),
                TimerDirective::Arm(HOLD),
                TimerDirective::Arm(SPEED),
            ]
        );
    }

    #[test]
    fn test_loop_closure() {
        for len in 1..=6 {
            let (mut scheduler, _) = playing((0..len).collect());
            let start = scheduler.position();
            for _ in 0..len {
                scheduler.fire();
            }
            assert_eq!(scheduler.position(), start, "sequence of {len}");
        }
    }

    #[test]
    fn test_single_frame_never_flickers() {
        let (mut scheduler, first) = playing(vec![100]);
        assert_eq!(first.timer, TimerDirective::Arm(HOLD));
        for _ in 0..5 {
            let step = scheduler.fire();
            assert!(step.commands.is_empty());
            assert_eq!(scheduler.current(), Some(100));
        }
    }

    #[test]
    fn test_reload_restarts_from_zero() {
        let (mut scheduler, _) = playing(vec![1, 2, 3]);
        scheduler.fire();
        assert_eq!(scheduler.position(), 1);

        scheduler.load(vec![7, 8]);
        assert_eq!(scheduler.phase(), PlaybackPhase::Priming);
        assert_eq!(scheduler.current(), Some(7));
    }

    #[test]
    fn test_custom_timing() {
        let mut scheduler = PlaybackScheduler::new(PlaybackConfig {
            animation_speed: Duration::from_millis(300),
            fade_in: Duration::from_millis(500),
            boundary_pause: Duration::from_millis(1000),
            visible_opacity: 0.8,
        });
        assert_eq!(
            scheduler.load(vec![1, 2]),
            TimerDirective::Arm(Duration::from_millis(1000))
        );
        assert_eq!(scheduler.config().visible_opacity, 0.8);
        scheduler.fire();
        let step = scheduler.fire();
        assert_eq!(step.timer, TimerDirective::Arm(Duration::from_millis(1300)));
        assert!(step.commands.contains(&VisibilityCommand::Show {
            timestamp: 2,
            opacity: 0.8
        }));
    }
}
