use embassy_time::Duration;
use keyrole_types::action::MouseAction;
use strum::EnumCount;

use crate::config::MouseKineticConfig;

/// Mouse actions applied in the current tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActiveMouseStates {
    states: [bool; MouseAction::COUNT],
}

impl ActiveMouseStates {
    pub fn activate(&mut self, action: MouseAction) {
        self.states[action as usize] = true;
    }

    pub fn is_active(&self, action: MouseAction) -> bool {
        self.states[action as usize]
    }

    pub fn clear(&mut self) {
        self.states = [false; MouseAction::COUNT];
    }

    /// Button bits of the mouse report
    pub fn buttons(&self) -> u8 {
        let mut buttons = 0;
        if self.is_active(MouseAction::LeftClick) {
            buttons |= 1 << 0;
        }
        if self.is_active(MouseAction::RightClick) {
            buttons |= 1 << 1;
        }
        if self.is_active(MouseAction::MiddleClick) {
            buttons |= 1 << 2;
        }
        buttons
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MouseSpeed {
    Normal,
    Accelerated,
    Decelerated,
}

/// Kinetic state of one mouse axis pair, pointer or wheel.
///
/// Speed ramps towards a target speed while a direction is held. Displacement accumulates with its fractional
/// part kept across ticks, only whole units are emitted.
pub struct MouseKineticState {
    config: MouseKineticConfig,
    is_scroll: bool,
    up: MouseAction,
    down: MouseAction,
    left: MouseAction,
    right: MouseAction,
    current_speed: f32,
    target_speed: f32,
    prev_mouse_speed: MouseSpeed,
    was_move_action: bool,
    x_sum: f32,
    y_sum: f32,
}

impl MouseKineticState {
    fn new(
        config: MouseKineticConfig,
        is_scroll: bool,
        up: MouseAction,
        down: MouseAction,
        left: MouseAction,
        right: MouseAction,
    ) -> Self {
        Self {
            config,
            is_scroll,
            up,
            down,
            left,
            right,
            current_speed: 0.0,
            target_speed: 0.0,
            prev_mouse_speed: MouseSpeed::Normal,
            was_move_action: false,
            x_sum: 0.0,
            y_sum: 0.0,
        }
    }

    /// Pointer movement. Output is (x, y), y grows downwards.
    pub fn pointer(config: MouseKineticConfig) -> Self {
        Self::new(
            config,
            false,
            MouseAction::MoveUp,
            MouseAction::MoveDown,
            MouseAction::MoveLeft,
            MouseAction::MoveRight,
        )
    }

    /// Wheel movement. Output is (pan, wheel), wheel grows upwards.
    pub fn scroll(config: MouseKineticConfig) -> Self {
        Self::new(
            config,
            true,
            MouseAction::ScrollDown,
            MouseAction::ScrollUp,
            MouseAction::ScrollLeft,
            MouseAction::ScrollRight,
        )
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    /// Advance the state by `elapsed` and return the whole units moved on both axes
    pub fn process(&mut self, active: &ActiveMouseStates, elapsed: Duration) -> (i8, i8) {
        // Nothing integrates without time
        if elapsed.as_ticks() == 0 {
            return (0, 0);
        }

        let multiplier = self.config.int_multiplier as f32;
        let initial_speed = self.config.initial_speed as f32 * multiplier;
        let acceleration = self.config.acceleration as f32 * multiplier;
        let decelerated_speed = self.config.decelerated_speed as f32 * multiplier;
        let base_speed = self.config.base_speed as f32 * multiplier;
        let accelerated_speed = self.config.accelerated_speed as f32 * multiplier;

        let accelerate = active.is_active(MouseAction::Accelerate);
        let decelerate = active.is_active(MouseAction::Decelerate);

        if !self.was_move_action && !decelerate {
            self.current_speed = initial_speed;
        }

        let up = active.is_active(self.up);
        let down = active.is_active(self.down);
        let left = active.is_active(self.left);
        let right = active.is_active(self.right);
        let is_move_action = up || down || left || right;

        let mut mouse_speed = MouseSpeed::Normal;
        if accelerate {
            self.target_speed = accelerated_speed;
            mouse_speed = MouseSpeed::Accelerated;
        } else if decelerate {
            self.target_speed = decelerated_speed;
            mouse_speed = MouseSpeed::Decelerated;
        } else if is_move_action {
            self.target_speed = base_speed;
        }

        if mouse_speed == MouseSpeed::Accelerated
            || (self.was_move_action && is_move_action && self.prev_mouse_speed != mouse_speed)
        {
            self.current_speed = self.target_speed;
        }

        let mut out = (0, 0);
        if is_move_action {
            let elapsed_secs = elapsed.as_micros() as f32 / 1_000_000.0;
            if self.current_speed < self.target_speed {
                self.current_speed = (self.current_speed + acceleration * elapsed_secs).min(self.target_speed);
            } else {
                self.current_speed = (self.current_speed - acceleration * elapsed_secs).max(self.target_speed);
            }

            let distance = self.current_speed * elapsed_secs;
            let first_tick = !self.was_move_action;

            if self.is_scroll && first_tick {
                self.x_sum = 0.0;
                self.y_sum = 0.0;
            }

            // Left wins over right, up wins over down
            let horizontal = if left {
                self.x_sum -= distance;
                true
            } else if right {
                self.x_sum += distance;
                true
            } else {
                false
            };
            let vertical = if up {
                self.y_sum -= distance;
                true
            } else if down {
                self.y_sum += distance;
                true
            } else {
                false
            };

            out = (take_whole(&mut self.x_sum), take_whole(&mut self.y_sum));

            // A tap on a scroll key always moves by one step
            if self.is_scroll && first_tick {
                if out.0 == 0 && horizontal {
                    out.0 = step(self.x_sum);
                    self.x_sum = 0.0;
                }
                if out.1 == 0 && vertical {
                    out.1 = step(self.y_sum);
                    self.y_sum = 0.0;
                }
            }
        } else {
            self.current_speed = 0.0;
        }

        self.prev_mouse_speed = mouse_speed;
        self.was_move_action = is_move_action;

        out
    }
}

/// Take the whole units out of an accumulator, as many as fit in a report.
/// The fraction and anything beyond the report range stay for the next ticks.
fn take_whole(sum: &mut f32) -> i8 {
    // Truncation towards zero keeps the fraction with its sign
    let whole = (*sum as i32).clamp(i8::MIN as i32, i8::MAX as i32) as i8;
    *sum -= whole as f32;
    whole
}

fn step(sum: f32) -> i8 {
    if sum > 0.0 {
        1
    } else if sum < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn active(actions: &[MouseAction]) -> ActiveMouseStates {
        let mut states = ActiveMouseStates::default();
        for a in actions {
            states.activate(*a);
        }
        states
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_buttons() {
        let states = active(&[MouseAction::LeftClick, MouseAction::MiddleClick]);
        assert_eq!(states.buttons(), 0b101);
        assert_eq!(ActiveMouseStates::default().buttons(), 0);
    }

    #[test]
    fn test_pointer_accelerates_towards_base_speed() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let right = active(&[MouseAction::MoveRight]);
        let mut total = 0i32;
        for _ in 0..1000 {
            let (x, y) = state.process(&right, ms(1));
            assert_eq!(y, 0);
            assert!((0..=1).contains(&x));
            total += x as i32;
        }
        // 125 units/s ramping to 1000 units/s over one second
        assert!((555..=565).contains(&total), "moved {}", total);
        assert!((state.current_speed() - 1000.0).abs() < 1.0);
        assert!(state.x_sum >= 0.0 && state.x_sum < 1.0);
    }

    #[test]
    fn test_pointer_stops_when_released() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let up = active(&[MouseAction::MoveUp]);
        for _ in 0..100 {
            let (x, y) = state.process(&up, ms(1));
            assert_eq!(x, 0);
            assert!(y <= 0);
        }
        assert_eq!(state.process(&ActiveMouseStates::default(), ms(1)), (0, 0));
        assert_eq!(state.current_speed(), 0.0);
    }

    #[test]
    fn test_accelerate_jumps_to_accelerated_speed() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let fast = active(&[MouseAction::MoveRight, MouseAction::Accelerate]);
        for _ in 0..10 {
            assert_eq!(state.process(&fast, ms(1)), (2, 0));
        }
    }

    #[test]
    fn test_zero_elapsed_is_idempotent() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let diagonal = active(&[MouseAction::MoveDown, MouseAction::MoveLeft]);
        for _ in 0..7 {
            state.process(&diagonal, ms(1));
        }
        let (speed, x_sum, y_sum) = (state.current_speed, state.x_sum, state.y_sum);
        assert_eq!(state.process(&diagonal, ms(0)), (0, 0));
        assert_eq!(state.process(&ActiveMouseStates::default(), ms(0)), (0, 0));
        assert_eq!((state.current_speed, state.x_sum, state.y_sum), (speed, x_sum, y_sum));
    }

    #[test]
    fn test_scroll_tap_moves_one_step() {
        let mut state = MouseKineticState::scroll(MouseKineticConfig::scroll());
        let scroll_up = active(&[MouseAction::ScrollUp]);
        assert_eq!(state.process(&scroll_up, ms(1)), (0, 1));
        assert_eq!(state.process(&scroll_up, ms(1)), (0, 0));

        // Released and pressed again, the first tick snaps again
        state.process(&ActiveMouseStates::default(), ms(1));
        let scroll_left = active(&[MouseAction::ScrollLeft]);
        assert_eq!(state.process(&scroll_left, ms(1)), (-1, 0));
    }

    #[test]
    fn test_opposite_directions_left_wins() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let both = active(&[MouseAction::MoveLeft, MouseAction::MoveRight]);
        let mut total = 0i32;
        for _ in 0..100 {
            let (x, _) = state.process(&both, ms(1));
            assert!(x <= 0);
            total += x as i32;
        }
        assert!(total < 0);

        let mut state = MouseKineticState::scroll(MouseKineticConfig::scroll());
        let both = active(&[MouseAction::ScrollLeft, MouseAction::ScrollRight]);
        assert_eq!(state.process(&both, ms(1)), (-1, 0));
    }

    #[test]
    fn test_long_tick_carries_excess_over_report_range() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let fast = active(&[MouseAction::MoveRight, MouseAction::Accelerate]);
        // 2000 units/s for 100 ms
        assert_eq!(state.process(&fast, ms(100)), (127, 0));
        let (x, _) = state.process(&fast, ms(1));
        assert!((74..=76).contains(&x), "carried {}", x);
    }

    #[test]
    fn test_long_tick_carries_excess_backwards() {
        let mut state = MouseKineticState::pointer(MouseKineticConfig::pointer());
        let fast = active(&[MouseAction::MoveUp, MouseAction::Accelerate]);
        assert_eq!(state.process(&fast, ms(200)), (0, -128));
        assert_eq!(state.process(&fast, ms(0)), (0, 0));
        let mut total = -128i32;
        for _ in 0..3 {
            total += state.process(&fast, ms(1)).1 as i32;
        }
        // 400 units in the first tick plus 2 in each following one
        assert!((-407..=-405).contains(&total), "moved {}", total);
    }
}
