use serde::{Deserialize, Serialize};

/// One step of a battery discharge profile. Exactly one of the load fields
/// should be set; the server rejects anything else.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatteryProfileStep {
    /// Load current (A).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Load resistance (Ω).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    /// Load power (W).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Step duration (s).
    pub duration: f64,
}

impl BatteryProfileStep {
    pub fn current(current: f64, duration: f64) -> BatteryProfileStep {
        BatteryProfileStep {
            current: Some(current),
            duration,
            ..Default::default()
        }
    }

    pub fn resistance(resistance: f64, duration: f64) -> BatteryProfileStep {
        BatteryProfileStep {
            resistance: Some(resistance),
            duration,
            ..Default::default()
        }
    }

    pub fn power(power: f64, duration: f64) -> BatteryProfileStep {
        BatteryProfileStep {
            power: Some(power),
            duration,
            ..Default::default()
        }
    }
}

/// Measurement produced at the end of each battery profiling step.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BatteryData {
    /// Seconds since profiling start.
    pub timestamp: f64,
    pub iteration: u32,
    pub step: u32,
    /// Voltage at the end of the step (V).
    pub voltage: f64,
    /// Accumulated discharge since profiling start (C).
    pub discharge: f64,
}

#[cfg(test)]
mod tests {
    use serde_json::{json, to_value};

    use super::*;

    #[test]
    fn test_step_serializes_single_load_field() {
        let step = BatteryProfileStep::current(0.2, 30.0);
        assert_eq!(
            to_value(step).unwrap(),
            json!({ "current": 0.2, "duration": 30.0 })
        );

        let step = BatteryProfileStep::resistance(18.0, 10.0);
        assert_eq!(
            to_value(step).unwrap(),
            json!({ "resistance": 18.0, "duration": 10.0 })
        );

        let step = BatteryProfileStep::power(0.5, 5.0);
        assert_eq!(
            to_value(step).unwrap(),
            json!({ "power": 0.5, "duration": 5.0 })
        );
    }

    #[test]
    fn test_battery_data() {
        let data: BatteryData = serde_json::from_value(json!({
            "timestamp": 12.5,
            "iteration": 2,
            "step": 1,
            "voltage": 3.7,
            "discharge": 54.0,
        }))
        .unwrap();

        assert_eq!(data.iteration, 2);
        assert_eq!(data.voltage, 3.7);
    }
}
