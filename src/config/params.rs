//! Slider-backed generation parameters

use serde::{Deserialize, Serialize};

/// Context window slider: 512..=4096 in steps of 256
pub const CONTEXT_SIZE: SliderSpec = SliderSpec {
    label: "Context size (n_ctx)",
    min: 512.0,
    max: 4096.0,
    step: 256.0,
    default: 2048.0,
};

/// Temperature slider: 0.0..=1.0 in steps of 0.01
pub const TEMPERATURE: SliderSpec = SliderSpec {
    label: "Temperature",
    min: 0.0,
    max: 1.0,
    step: 0.01,
    default: 0.7,
};

/// Bounds and default of a numeric slider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl SliderSpec {
    /// Check that a value lies inside the range and on a step
    pub fn accepts(&self, value: f64) -> bool {
        if !(self.min..=self.max).contains(&value) {
            return false;
        }
        let steps = (value - self.min) / self.step;
        (steps - steps.round()).abs() < 1e-6
    }
}

/// A numeric value constrained to a range and step grid
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    spec: SliderSpec,
    steps: u32,
}

impl Slider {
    pub fn new(spec: SliderSpec) -> Self {
        let mut slider = Self { spec, steps: 0 };
        slider.set(spec.default);
        slider
    }

    /// Start from `value` instead of the slider default
    pub fn with_value(mut self, value: f64) -> Self {
        self.set(value);
        self
    }

    pub fn label(&self) -> &'static str {
        self.spec.label
    }

    pub fn spec(&self) -> &SliderSpec {
        &self.spec
    }

    fn max_steps(&self) -> u32 {
        ((self.spec.max - self.spec.min) / self.spec.step).round() as u32
    }

    /// Snap to the nearest step, clamped to the range
    pub fn set(&mut self, value: f64) {
        let steps = ((value - self.spec.min) / self.spec.step).round();
        self.steps = steps.clamp(0.0, self.max_steps() as f64) as u32;
    }

    pub fn value(&self) -> f64 {
        let value = self.spec.min + self.steps as f64 * self.spec.step;
        value.min(self.spec.max)
    }

    pub fn increase(&mut self) {
        self.steps = (self.steps + 1).min(self.max_steps());
    }

    pub fn decrease(&mut self) {
        self.steps = self.steps.saturating_sub(1);
    }

    /// Position within the range as 0.0..=1.0
    pub fn ratio(&self) -> f64 {
        let max_steps = self.max_steps();
        if max_steps == 0 {
            return 0.0;
        }
        self.steps as f64 / max_steps as f64
    }
}

/// Values read from the sliders when loading or generating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Context window passed to the model loader
    pub n_ctx: u32,

    /// Sampling temperature, used only at generation time
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            n_ctx: CONTEXT_SIZE.default as u32,
            temperature: TEMPERATURE.default as f32,
        }
    }
}

impl GenerationSettings {
    pub fn from_sliders(context: &Slider, temperature: &Slider) -> Self {
        Self {
            n_ctx: context.value().round() as u32,
            temperature: temperature.value() as f32,
        }
    }
}
