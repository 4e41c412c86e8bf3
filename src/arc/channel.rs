use serde::{Deserialize, Serialize};

/// Measurement channels of an Arc device and their mapping to the short
/// codes understood by the TCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Main current (A).
    #[serde(rename = "mc")]
    MainCurrent,
    /// Main voltage (V).
    #[serde(rename = "mv")]
    MainVoltage,
    /// Main energy (J).
    #[serde(rename = "me")]
    MainEnergy,
    /// ADC current (A).
    #[serde(rename = "ac")]
    AdcCurrent,
    /// ADC voltage (V).
    #[serde(rename = "av")]
    AdcVoltage,
    /// ADC energy (J).
    #[serde(rename = "ae")]
    AdcEnergy,
    /// Sense- voltage (V).
    #[serde(rename = "sn")]
    SenseMinusVoltage,
    /// Sense+ voltage (V).
    #[serde(rename = "sp")]
    SensePlusVoltage,
    /// VBUS voltage (V).
    #[serde(rename = "vb")]
    Vbus,
    /// Temperature (°C).
    #[serde(rename = "tp")]
    Temperature,
    /// UART log text.
    #[serde(rename = "rx")]
    UartLogs,
    #[serde(rename = "i1")]
    Gpi1,
    #[serde(rename = "i2")]
    Gpi2,
}

impl Channel {
    pub fn code(&self) -> &'static str {
        match self {
            Channel::MainCurrent => "mc",
            Channel::MainVoltage => "mv",
            Channel::MainEnergy => "me",
            Channel::AdcCurrent => "ac",
            Channel::AdcVoltage => "av",
            Channel::AdcEnergy => "ae",
            Channel::SenseMinusVoltage => "sn",
            Channel::SensePlusVoltage => "sp",
            Channel::Vbus => "vb",
            Channel::Temperature => "tp",
            Channel::UartLogs => "rx",
            Channel::Gpi1 => "i1",
            Channel::Gpi2 => "i2",
        }
    }

    /// Channels carrying timestamped entries rather than sampled values.
    pub(crate) fn is_log(&self) -> bool {
        matches!(self, Channel::UartLogs | Channel::Gpi1 | Channel::Gpi2)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, to_value};

    use super::*;

    const CHANNELS: [(Channel, &str); 13] = [
        (Channel::MainCurrent, "mc"),
        (Channel::MainVoltage, "mv"),
        (Channel::MainEnergy, "me"),
        (Channel::AdcCurrent, "ac"),
        (Channel::AdcVoltage, "av"),
        (Channel::AdcEnergy, "ae"),
        (Channel::SenseMinusVoltage, "sn"),
        (Channel::SensePlusVoltage, "sp"),
        (Channel::Vbus, "vb"),
        (Channel::Temperature, "tp"),
        (Channel::UartLogs, "rx"),
        (Channel::Gpi1, "i1"),
        (Channel::Gpi2, "i2"),
    ];

    #[test]
    fn test_wire_codes() {
        for (channel, code) in CHANNELS {
            assert_eq!(to_value(channel).unwrap(), json!(code));
            assert_eq!(channel.code(), code);
        }
    }

    #[test]
    fn test_log_channels() {
        for (channel, _) in CHANNELS {
            let expected = matches!(channel, Channel::UartLogs | Channel::Gpi1 | Channel::Gpi2);
            assert_eq!(channel.is_log(), expected);
        }
    }
}
