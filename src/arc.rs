mod battery;
mod channel;
mod supply;

pub use battery::{BatteryData, BatteryProfileStep};
pub use channel::Channel;
pub use supply::Supply;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connection::Connection;
use crate::message::{Request, ResponseBody};
use crate::toggle::Toggle;
use crate::Result;

const CALIBRATE_TIMEOUT: Duration = Duration::from_secs(10);
const FIRMWARE_UPGRADE_TIMEOUT: Duration = Duration::from_secs(15);
const BATTERY_DATA_GRACE: Duration = Duration::from_secs(60);

/// Device parameters as reported by the server when listing devices.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub device_id: String,
    pub name: String,
}

/// Hardware and firmware versions of a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    pub hw_version: String,
    pub fw_version: String,
}

/// State of 4-wire measurements using Sense+/-.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FourWireState {
    CalInvalid,
    Disabled,
    Inactive,
    Active,
}

/// Current measurement range on the main output. `Low` enables auto-range,
/// `High` forces high range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementRange {
    Low,
    High,
}

/// Power regulation mode of the main output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerRegulation {
    Voltage,
    Current,
    Off,
}

/// Handle for one Arc device. Every operation pairs its command with the
/// device identifier and runs over the shared server connection.
pub struct Arc {
    kind: String,
    id: String,
    name: String,
    connection: Connection,
}

impl Arc {
    pub fn new(info: DeviceInfo, connection: Connection) -> Arc {
        Arc {
            kind: info.kind,
            id: info.device_id,
            name: info.name,
            connection,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    async fn request(&self, cmd: &'static str, data: Value) -> Result<ResponseBody> {
        self.connection.send_and_receive(Request::new(cmd, data)).await
    }

    async fn request_with_timeout(
        &self,
        cmd: &'static str,
        data: Value,
        timeout: Option<Duration>,
    ) -> Result<ResponseBody> {
        self.connection
            .send_and_receive_with_timeout(Request::new(cmd, data), timeout)
            .await
    }

    async fn command(&self, cmd: &'static str, data: Value) -> Result<()> {
        self.request(cmd, data).await?;
        Ok(())
    }

    /// Perform internal calibration.
    pub async fn calibrate(&self) -> Result<()> {
        self.request_with_timeout(
            "arc_calibrate",
            json!({ "device_id": self.id }),
            Some(CALIBRATE_TIMEOUT),
        )
        .await?;
        Ok(())
    }

    /// Enable or disable the 5V pin.
    pub async fn toggle_5v(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_enable_5v",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_5v(&self) -> Result<()> {
        self.toggle_5v(Toggle::On).await
    }

    pub async fn disable_5v(&self) -> Result<()> {
        self.toggle_5v(Toggle::Off).await
    }

    /// Start or stop discharge profiling of a connected battery.
    pub async fn toggle_battery_profiling(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_enable_battery_profiling",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_battery_profiling(&self) -> Result<()> {
        self.toggle_battery_profiling(Toggle::On).await
    }

    pub async fn disable_battery_profiling(&self) -> Result<()> {
        self.toggle_battery_profiling(Toggle::Off).await
    }

    /// Enable or disable a measurement channel.
    pub async fn toggle_channel(&self, channel: Channel, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_enable_channel",
            json!({ "device_id": self.id, "channel": channel, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_channel(&self, channel: Channel) -> Result<()> {
        self.toggle_channel(channel, Toggle::On).await
    }

    pub async fn disable_channel(&self, channel: Channel) -> Result<()> {
        self.toggle_channel(channel, Toggle::Off).await
    }

    /// Enable or disable the expansion port.
    pub async fn toggle_exp_port(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_enable_exp_port",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_exp_port(&self) -> Result<()> {
        self.toggle_exp_port(Toggle::On).await
    }

    pub async fn disable_exp_port(&self) -> Result<()> {
        self.toggle_exp_port(Toggle::Off).await
    }

    /// Enable or disable the UART.
    pub async fn toggle_uart(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_enable_uart",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_uart(&self) -> Result<()> {
        self.toggle_uart(Toggle::On).await
    }

    pub async fn disable_uart(&self) -> Result<()> {
        self.toggle_uart(Toggle::Off).await
    }

    /// Get the 4-wire measurement state.
    pub async fn get_4wire(&self) -> Result<FourWireState> {
        let response = self
            .request("arc_get_4wire", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the ADC shunt resistor value (Ω).
    pub async fn get_adc_resistor(&self) -> Result<f64> {
        let response = self
            .request("arc_get_adc_resistor", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the sample rate of a channel.
    pub async fn get_channel_samplerate(&self, channel: Channel) -> Result<u32> {
        let response = self
            .request(
                "arc_get_channel_samplerate",
                json!({ "device_id": self.id, "channel": channel }),
            )
            .await?;
        response.field("value")
    }

    /// Get the voltage of the expansion port (V).
    pub async fn get_exp_voltage(&self) -> Result<f64> {
        let response = self
            .request("arc_get_exp_voltage", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the state of one of the GPI pins, 1 or 2.
    pub async fn get_gpi(&self, pin: u8) -> Result<bool> {
        let response = self
            .request("arc_get_gpi", json!({ "device_id": self.id, "pin": pin }))
            .await?;
        response.field("value")
    }

    /// Get the state of the main power.
    pub async fn get_main(&self) -> Result<bool> {
        let response = self
            .request("arc_get_main", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the main voltage (V).
    pub async fn get_main_voltage(&self) -> Result<f64> {
        let response = self
            .request("arc_get_main_voltage", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the max allowed current (A).
    pub async fn get_max_current(&self) -> Result<f64> {
        let response = self
            .request("arc_get_max_current", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the measurement range on the main output.
    pub async fn get_range(&self) -> Result<MeasurementRange> {
        let response = self
            .request("arc_get_range", json!({ "device_id": self.id }))
            .await?;
        response.field("range")
    }

    /// The RX pin can be used as a GPI when the UART is disabled.
    pub async fn get_rx(&self) -> Result<bool> {
        let response = self
            .request("arc_get_rx", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// True if the voltage source limits at constant current, false if it
    /// cuts off.
    pub async fn get_src_cur_limit_enabled(&self) -> Result<bool> {
        let response = self
            .request(
                "arc_get_src_cur_limit_enabled",
                json!({ "device_id": self.id }),
            )
            .await?;
        response.field("enabled")
    }

    /// List all available supplies.
    pub async fn get_supplies(&self) -> Result<Vec<Supply>> {
        let response = self
            .request("arc_get_supplies", json!({ "device_id": self.id }))
            .await?;
        response.field("supplies")
    }

    /// Get the id of the current power supply.
    pub async fn get_supply(&self) -> Result<i64> {
        let response = self
            .request("arc_get_supply", json!({ "device_id": self.id }))
            .await?;
        response.field("supply_id")
    }

    /// Get the number of simulated batteries in parallel.
    pub async fn get_supply_parallel(&self) -> Result<u32> {
        let response = self
            .request("arc_get_supply_parallel", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the number of simulated batteries in series.
    pub async fn get_supply_series(&self) -> Result<u32> {
        let response = self
            .request("arc_get_supply_series", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the state of power supply State of Charge tracking.
    pub async fn get_supply_soc_tracking(&self) -> Result<bool> {
        let response = self
            .request(
                "arc_get_supply_soc_tracking",
                json!({ "device_id": self.id }),
            )
            .await?;
        response.field("enabled")
    }

    /// Get the used capacity of the power supply (C).
    pub async fn get_supply_used_capacity(&self) -> Result<f64> {
        let response = self
            .request(
                "arc_get_supply_used_capacity",
                json!({ "device_id": self.id }),
            )
            .await?;
        response.field("value")
    }

    /// Get the UART baud rate.
    pub async fn get_uart_baudrate(&self) -> Result<u32> {
        let response = self
            .request("arc_get_uart_baudrate", json!({ "device_id": self.id }))
            .await?;
        response.field("value")
    }

    /// Get the present value of a channel (A/V/°C/digital). Not available
    /// for the UART log channel.
    pub async fn get_value(&self, channel: Channel) -> Result<f64> {
        let response = self
            .request(
                "arc_get_value",
                json!({ "device_id": self.id, "channel": channel }),
            )
            .await?;
        response.field("value")
    }

    /// Get hardware and firmware versions.
    pub async fn get_version(&self) -> Result<Version> {
        let response = self
            .request("arc_get_version", json!({ "device_id": self.id }))
            .await?;
        response.parse()
    }

    /// Check if the device is connected.
    pub async fn is_connected(&self) -> Result<bool> {
        let response = self
            .request("arc_is_connected", json!({ "device_id": self.id }))
            .await?;
        response.field("connected")
    }

    /// Enable or disable 4-wire measurements using Sense+/-.
    pub async fn toggle_4wire(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_set_4wire",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_4wire(&self) -> Result<()> {
        self.toggle_4wire(Toggle::On).await
    }

    pub async fn disable_4wire(&self) -> Result<()> {
        self.toggle_4wire(Toggle::Off).await
    }

    /// Set the ADC shunt resistor value, 0.001–22 (Ω). The bound is not
    /// checked locally; out-of-range values fail remotely.
    pub async fn set_adc_resistor(&self, value: f64) -> Result<()> {
        self.command(
            "arc_set_adc_resistor",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// Set the battery discharge profile, at most 10 steps.
    pub async fn set_battery_profile(&self, steps: &[BatteryProfileStep]) -> Result<()> {
        self.command(
            "arc_set_battery_profile",
            json!({ "device_id": self.id, "value": steps }),
        )
        .await
    }

    /// Set the sample rate of a channel.
    pub async fn set_channel_samplerate(&self, channel: Channel, samplerate: u32) -> Result<()> {
        self.command(
            "arc_set_channel_samplerate",
            json!({ "device_id": self.id, "channel": channel, "value": samplerate }),
        )
        .await
    }

    /// Set the voltage of the expansion port, 1.2–5 (V).
    pub async fn set_exp_voltage(&self, value: f64) -> Result<()> {
        self.command(
            "arc_set_exp_voltage",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// Set the state of one of the GPO pins, 1 or 2.
    pub async fn toggle_gpo(&self, pin: u8, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_set_gpo",
            json!({ "device_id": self.id, "pin": pin, "value": toggle }),
        )
        .await
    }

    pub async fn enable_gpo(&self, pin: u8) -> Result<()> {
        self.toggle_gpo(pin, Toggle::On).await
    }

    pub async fn disable_gpo(&self, pin: u8) -> Result<()> {
        self.toggle_gpo(pin, Toggle::Off).await
    }

    /// Turn the main power on or off.
    pub async fn toggle_main(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_set_main",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_main(&self) -> Result<()> {
        self.toggle_main(Toggle::On).await
    }

    pub async fn disable_main(&self) -> Result<()> {
        self.toggle_main(Toggle::Off).await
    }

    /// Set the main current (A), used in constant current mode.
    pub async fn set_main_current(&self, value: f64) -> Result<()> {
        self.command(
            "arc_set_main_current",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// Set the main voltage (V).
    pub async fn set_main_voltage(&self, value: f64) -> Result<()> {
        self.command(
            "arc_set_main_voltage",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// When the current exceeds this value, the main power cuts off.
    /// 0.001–5 (A).
    pub async fn set_max_current(&self, value: f64) -> Result<()> {
        self.command(
            "arc_set_max_current",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// Set the power regulation mode.
    pub async fn set_power_regulation(&self, mode: PowerRegulation) -> Result<()> {
        self.command(
            "arc_set_power_regulation",
            json!({ "device_id": self.id, "mode": mode }),
        )
        .await
    }

    /// Set the measurement range on the main output.
    pub async fn set_range(&self, range: MeasurementRange) -> Result<()> {
        self.command(
            "arc_set_range",
            json!({ "device_id": self.id, "range": range }),
        )
        .await
    }

    /// Enable voltage source current limit (constant current) operation;
    /// off means cut-off.
    pub async fn toggle_src_cur_limit(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_set_src_cur_limit_enabled",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_src_cur_limit(&self) -> Result<()> {
        self.toggle_src_cur_limit(Toggle::On).await
    }

    pub async fn disable_src_cur_limit(&self) -> Result<()> {
        self.toggle_src_cur_limit(Toggle::Off).await
    }

    /// Set the power supply type, with the number of simulated batteries
    /// in series and in parallel.
    pub async fn set_supply(&self, supply_id: i64, series: u32, parallel: u32) -> Result<()> {
        self.command(
            "arc_set_supply",
            json!({
                "device_id": self.id,
                "supply_id": supply_id,
                "series": series,
                "parallel": parallel,
            }),
        )
        .await
    }

    /// Enable or disable power supply State of Charge tracking.
    pub async fn toggle_supply_soc_tracking(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_set_supply_soc_tracking",
            json!({ "device_id": self.id, "enable": toggle }),
        )
        .await
    }

    pub async fn enable_supply_soc_tracking(&self) -> Result<()> {
        self.toggle_supply_soc_tracking(Toggle::On).await
    }

    pub async fn disable_supply_soc_tracking(&self) -> Result<()> {
        self.toggle_supply_soc_tracking(Toggle::Off).await
    }

    /// Set the used capacity of the power supply in coulombs; multiply mAh
    /// by 3.6 to get C.
    pub async fn set_supply_used_capacity(&self, value: f64) -> Result<()> {
        self.command(
            "arc_set_supply_used_capacity",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// The TX pin can be used as a GPO when the UART is disabled.
    pub async fn toggle_tx(&self, toggle: Toggle) -> Result<()> {
        self.command(
            "arc_set_tx",
            json!({ "device_id": self.id, "value": toggle }),
        )
        .await
    }

    pub async fn enable_tx(&self) -> Result<()> {
        self.toggle_tx(Toggle::On).await
    }

    pub async fn disable_tx(&self) -> Result<()> {
        self.toggle_tx(Toggle::Off).await
    }

    /// Set the UART baud rate.
    pub async fn set_uart_baudrate(&self, value: u32) -> Result<()> {
        self.command(
            "arc_set_uart_baudrate",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    /// Wait for battery profiling data, at most `timeout`. `None` means
    /// the wait timed out remotely, which can happen earlier when another
    /// device is returning battery data.
    pub async fn wait_for_battery_data(&self, timeout: Duration) -> Result<Option<BatteryData>> {
        let response = self
            .request_with_timeout(
                "arc_wait_for_battery_data",
                json!({ "device_id": self.id, "timeout": timeout.as_millis() as u64 }),
                Some(BATTERY_DATA_GRACE + timeout),
            )
            .await?;
        response.field("value")
    }

    /// Write data to TX.
    pub async fn write_tx(&self, value: &str) -> Result<()> {
        self.command(
            "arc_write_tx",
            json!({ "device_id": self.id, "value": value }),
        )
        .await
    }

    pub async fn get_property(&self, name: &str) -> Result<Option<Value>> {
        let response = self
            .request(
                "arc_get_property",
                json!({ "device_id": self.id, "name": name }),
            )
            .await?;
        Ok(response
            .data
            .get("value")
            .filter(|value| !value.is_null())
            .cloned())
    }

    pub async fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.command(
            "arc_set_property",
            json!({ "device_id": self.id, "name": name, "value": value }),
        )
        .await
    }

    pub async fn commit(&self) -> Result<()> {
        self.command("arc_commit", json!({ "device_id": self.id }))
            .await
    }

    /// Initiate a device firmware update.
    pub async fn firmware_upgrade(&self, filename: Option<&str>) -> Result<()> {
        self.request_with_timeout(
            "arc_firmware_upgrade",
            json!({ "device_id": self.id, "filename": filename }),
            Some(FIRMWARE_UPGRADE_TIMEOUT),
        )
        .await?;
        Ok(())
    }
}
