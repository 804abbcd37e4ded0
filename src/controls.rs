//! The page's control surface: adjuster values, bound inputs, the auto toggle
//! and engage button, and the countdown readouts.

use serde::Serialize;

use crate::config::GongConfig;
use crate::scheduler::{IDLE_TEXT, ScheduleBounds};
use crate::synth::StrikeParameters;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Controls {
    pub volume: f64,
    pub tone: f64,
    pub dampen: f64,
    pub auto_lower: u32,
    pub auto_upper: u32,
    /// Smallest value the upper-bound input accepts; tracks `auto_lower`.
    pub auto_upper_min: u32,
    pub auto_enabled: bool,
    /// Countdown readout next to the auto controls.
    pub next_local: String,
    /// Countdown readout in the page header.
    pub next_global: String,
    pub engage_label: &'static str,
    pub engage_pressed: bool,
}

impl Controls {
    pub fn new(strike: StrikeParameters, bounds: ScheduleBounds) -> Self {
        let mut controls = Controls {
            volume: strike.volume,
            tone: strike.tone,
            dampen: strike.dampen,
            auto_lower: bounds.min(),
            auto_upper: bounds.max(),
            auto_upper_min: 1,
            auto_enabled: false,
            next_local: IDLE_TEXT.to_string(),
            next_global: IDLE_TEXT.to_string(),
            engage_label: "Engage",
            engage_pressed: false,
        };
        controls.enforce_bounds();
        controls.update_engage_label();
        controls
    }

    pub fn from_config(config: &GongConfig) -> Self {
        Controls::new(config.strike, config.bounds)
    }

    /// Current adjuster values as strike parameters.
    pub fn strike_parameters(&self) -> StrikeParameters {
        StrikeParameters {
            volume: self.volume,
            tone: self.tone,
            dampen: self.dampen,
        }
    }

    pub fn bounds(&self) -> ScheduleBounds {
        ScheduleBounds::new(self.auto_lower, self.auto_upper)
    }

    /// Lower bound at least 1; upper raised to the lower bound; the upper
    /// input's minimum follows the lower bound.
    pub fn enforce_bounds(&mut self) {
        self.auto_lower = self.auto_lower.max(1);
        if self.auto_upper < self.auto_lower {
            self.auto_upper = self.auto_lower;
        }
        self.auto_upper_min = self.auto_lower;
    }

    /// Apply raw text from the lower-bound input.
    pub fn set_lower_text(&mut self, text: &str) {
        self.auto_lower = parse_bound(text);
        self.enforce_bounds();
    }

    /// Apply raw text from the upper-bound input.
    pub fn set_upper_text(&mut self, text: &str) {
        self.auto_upper = parse_bound(text);
        self.enforce_bounds();
    }

    /// Mirror countdown text to both readouts.
    pub fn set_countdown(&mut self, text: &str) {
        self.next_local = text.to_string();
        self.next_global = text.to_string();
    }

    pub fn update_engage_label(&mut self) {
        self.engage_pressed = self.auto_enabled;
        self.engage_label = if self.auto_enabled {
            "Disengage"
        } else {
            "Engage"
        };
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls::new(StrikeParameters::default(), ScheduleBounds::default())
    }
}

/// Leading-integer parse of a text field, as number inputs report it.
/// Returns `None` when no digits lead the text.
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let t = text.trim_start();
    let (negative, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// A bound input value: its integer prefix, with missing or zero read as 1
/// and anything below 1 raised to 1.
pub fn parse_bound(text: &str) -> u32 {
    match parse_int_prefix(text) {
        Some(0) | None => 1,
        Some(v) => v.clamp(1, u32::MAX as i64) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_prefix_parsing() {
        assert_eq!(parse_int_prefix("12"), Some(12));
        assert_eq!(parse_int_prefix("  7s"), Some(7));
        assert_eq!(parse_int_prefix("3.9"), Some(3));
        assert_eq!(parse_int_prefix("-4"), Some(-4));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn bound_parsing_defaults_to_one() {
        assert_eq!(parse_bound(""), 1);
        assert_eq!(parse_bound("0"), 1);
        assert_eq!(parse_bound("-3"), 1);
        assert_eq!(parse_bound("15"), 15);
    }

    #[test]
    fn upper_below_lower_is_raised() {
        let mut c = Controls::default();
        c.set_lower_text("12");
        assert_eq!(c.auto_upper, 12);
        assert_eq!(c.auto_upper_min, 12);
        c.set_upper_text("4");
        assert_eq!(c.auto_upper, 12);
        assert_eq!(c.bounds(), ScheduleBounds::new(12, 12));
    }

    #[test]
    fn upper_min_tracks_lower() {
        let mut c = Controls::default();
        c.set_lower_text("2");
        assert_eq!(c.auto_upper_min, 2);
        assert_eq!(c.auto_upper, 10);
    }

    #[test]
    fn engage_label_follows_toggle() {
        let mut c = Controls::default();
        assert_eq!(c.engage_label, "Engage");
        c.auto_enabled = true;
        c.update_engage_label();
        assert_eq!(c.engage_label, "Disengage");
        assert!(c.engage_pressed);
    }

    #[test]
    fn countdown_mirrored() {
        let mut c = Controls::default();
        c.set_countdown("4");
        assert_eq!(c.next_local, "4");
        assert_eq!(c.next_global, "4");
    }
}
