//! Abstract gamepad buttons and a user-driven button configuration.
//!
//! Physical pads number their buttons and axes differently. A
//! [`Configuration`] maps [`StdButton`]s (positions on the W3C standard
//! layout) onto whatever the player presses while a button is being scanned.
//!
//! ```text
//!    [UL0]            [UR0]
//!    [UL1]            [UR1]
//!
//!    [LU]     [CC]     [RU]
//!  [LL][LR] [CL][CR] [RL][RR]
//!    [LD]              [RD]
//!         [AL]    [AR]
//! ```

use std::collections::{HashMap, HashSet};

/// Axis deflection at which an axis counts as a pressed button.
pub const THRESHOLD: f32 = 0.75;

/// Raw per-pad state a [`Configuration`] reads from.
///
/// [`crate::input::Input`] implements this for connected pads. Out-of-range
/// pads, buttons and axes read as released / zero.
pub trait GamepadSource {
    fn gamepad_axis_num(&self, id: usize) -> usize;
    fn gamepad_axis(&self, id: usize, axis: usize) -> f32;
    fn gamepad_button_num(&self, id: usize) -> usize;
    fn is_gamepad_button_pressed(&self, id: usize, button: usize) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StdButton {
    #[default]
    None,
    LL,
    LR,
    LU,
    LD,
    CL,
    CC,
    CR,
    RL,
    RR,
    RU,
    RD,
    UL0,
    UL1,
    UR0,
    UR1,
    AL,
    AR,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct AxisDirection {
    id: usize,
    positive: bool,
}

impl AxisDirection {
    fn is_pressed(&self, value: f32) -> bool {
        if self.positive {
            (THRESHOLD..=1.0).contains(&value)
        } else {
            (-1.0..=-THRESHOLD).contains(&value)
        }
    }
}

/// Mapping from standard buttons to physical buttons or axis directions.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    buttons: HashMap<StdButton, usize>,
    axes: HashMap<StdButton, AxisDirection>,
    assigned_buttons: HashSet<usize>,
    assigned_axes: HashSet<AxisDirection>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every mapping.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Try to bind `b` to whatever is held on pad `index` right now.
    ///
    /// Buttons win over axes; physical inputs already bound to another
    /// standard button are skipped. Returns whether a binding was made.
    pub fn scan<S: GamepadSource + ?Sized>(&mut self, source: &S, index: usize, b: StdButton) -> bool {
        self.forget(b);

        let button = (0..source.gamepad_button_num(index)).find(|button| {
            !self.assigned_buttons.contains(button) && source.is_gamepad_button_pressed(index, *button)
        });
        if let Some(button) = button {
            self.buttons.insert(b, button);
            self.assigned_buttons.insert(button);
            return true;
        }

        for id in 0..source.gamepad_axis_num(index) {
            let value = source.gamepad_axis(index, id);
            // Values above 1.0 come from buttons some drivers misreport as axes.
            for positive in [true, false] {
                let axis = AxisDirection { id, positive };
                if axis.is_pressed(value) && !self.assigned_axes.contains(&axis) {
                    self.axes.insert(b, axis);
                    self.assigned_axes.insert(axis);
                    return true;
                }
            }
        }

        false
    }

    pub fn is_button_pressed<S: GamepadSource + ?Sized>(&self, source: &S, id: usize, b: StdButton) -> bool {
        if let Some(button) = self.buttons.get(&b) {
            return source.is_gamepad_button_pressed(id, *button);
        }
        if let Some(axis) = self.axes.get(&b) {
            return axis.is_pressed(source.gamepad_axis(id, axis.id));
        }
        false
    }

    /// Human-readable binding of `b`, empty when unbound.
    pub fn name(&self, b: StdButton) -> String {
        if let Some(button) = self.buttons.get(&b) {
            return format!("Button {}", button);
        }
        match self.axes.get(&b) {
            Some(AxisDirection { id, positive: true }) => format!("Axis {}+", id),
            Some(AxisDirection { id, positive: false }) => format!("Axis {}-", id),
            None => String::new(),
        }
    }

    fn forget(&mut self, b: StdButton) {
        if let Some(button) = self.buttons.remove(&b) {
            self.assigned_buttons.remove(&button);
        }
        if let Some(axis) = self.axes.remove(&b) {
            self.assigned_axes.remove(&axis);
        }
    }
}
