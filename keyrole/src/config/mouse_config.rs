/// Speed curve of a mouse kinetic state.
///
/// Speeds are in units per second and get multiplied by `int_multiplier` before use.
/// Acceleration is in units per second squared.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseKineticConfig {
    pub int_multiplier: u16,
    pub initial_speed: u16,
    pub acceleration: u16,
    pub decelerated_speed: u16,
    pub base_speed: u16,
    pub accelerated_speed: u16,
}

impl MouseKineticConfig {
    /// Curve of the pointer movement
    pub const fn pointer() -> Self {
        Self {
            int_multiplier: 25,
            initial_speed: 5,
            acceleration: 35,
            decelerated_speed: 10,
            base_speed: 40,
            accelerated_speed: 80,
        }
    }

    /// Curve of the wheel
    pub const fn scroll() -> Self {
        Self {
            int_multiplier: 1,
            initial_speed: 20,
            acceleration: 20,
            decelerated_speed: 10,
            base_speed: 20,
            accelerated_speed: 50,
        }
    }
}
