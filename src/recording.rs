use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::arc::Channel;
use crate::connection::Connection;
use crate::message::{Request, ResponseBody};
use crate::Result;

/// Analog channel data is fetched in chunks of this many entries.
const CHUNK_SIZE: u64 = 40_000;

/// Recording parameters as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingInfo {
    pub recording_id: i64,
    pub name: String,
    /// Missing when the server does not support it.
    #[serde(default, rename = "start-time")]
    pub start_time: Option<DateTime<FixedOffset>>,
}

/// Data entries fetched from one channel of a recording. Sampled channels
/// carry plain values, log channels carry `{timestamp, value}` objects;
/// the remaining payload fields (offsets, sample interval and the like)
/// are kept as-is in `extra`.
#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct ChannelData {
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Handle for one recording on the server.
pub struct Recording {
    id: i64,
    name: String,
    start_time: Option<DateTime<FixedOffset>>,
    connection: Connection,
}

impl Recording {
    pub fn new(info: RecordingInfo, connection: Connection) -> Recording {
        Recording {
            id: info.recording_id,
            name: info.name,
            start_time: info.start_time,
            connection,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        self.start_time
    }

    async fn request(&self, cmd: &'static str, data: Value) -> Result<ResponseBody> {
        self.connection.send_and_receive(Request::new(cmd, data)).await
    }

    /// For commands operating over large quantities of data, where a fixed
    /// timeout would fire on big recordings.
    async fn request_blocking(&self, cmd: &'static str, data: Value) -> Result<ResponseBody> {
        self.connection
            .send_and_receive_with_timeout(Request::new(cmd, data), None)
            .await
    }

    /// Delete the recording. Consumes the handle, the id is gone remotely.
    pub async fn delete(self) -> Result<()> {
        self.request("recording_delete", json!({ "recording_id": self.id }))
            .await?;
        Ok(())
    }

    /// Downsample the recorded data of a channel by the given factor.
    pub async fn downsample_channel(
        &self,
        device_id: &str,
        channel: Channel,
        factor: u32,
    ) -> Result<()> {
        self.request_blocking(
            "recording_downsample_channel",
            json!({
                "recording_id": self.id,
                "device_id": device_id,
                "channel": channel,
                "factor": factor,
            }),
        )
        .await?;
        Ok(())
    }

    /// Get the number of data entries in a channel.
    pub async fn get_channel_data_count(&self, device_id: &str, channel: Channel) -> Result<u64> {
        let response = self
            .request(
                "recording_get_channel_data_count",
                json!({
                    "recording_id": self.id,
                    "device_id": device_id,
                    "channel": channel,
                }),
            )
            .await?;
        response.field("count")
    }

    /// Get the index of the data entry at a timestamp, in seconds.
    pub async fn get_channel_data_index(
        &self,
        device_id: &str,
        channel: Channel,
        timestamp: f64,
    ) -> Result<u64> {
        let response = self
            .request(
                "recording_get_channel_data_index",
                json!({
                    "recording_id": self.id,
                    "device_id": device_id,
                    "channel": channel,
                    "timestamp": timestamp,
                }),
            )
            .await?;
        response.field("index")
    }

    /// Get `count` data entries of a channel starting at `index`. Log-type
    /// channels are fetched in one request; sampled channels in chunks.
    /// `strip` removes control characters from UART log values.
    pub async fn get_channel_data(
        &self,
        device_id: &str,
        channel: Channel,
        index: u64,
        count: u64,
        strip: bool,
    ) -> Result<ChannelData> {
        if channel.is_log() {
            let response = self
                .request_blocking(
                    "recording_get_channel_data",
                    json!({
                        "recording_id": self.id,
                        "device_id": device_id,
                        "channel": channel,
                        "index": index,
                        "count": count,
                    }),
                )
                .await?;

            let mut data: ChannelData = response.parse()?;

            if channel == Channel::UartLogs && strip {
                for entry in &mut data.values {
                    if let Some(Value::String(text)) = entry.get_mut("value") {
                        *text = remove_control_characters(text);
                    }
                }
            }

            return Ok(data);
        }

        let mut data: Option<ChannelData> = None;
        let mut index = index;
        let mut count = count;

        while count > 0 {
            let chunk = count.min(CHUNK_SIZE);
            let response = self
                .request_blocking(
                    "recording_get_channel_data",
                    json!({
                        "recording_id": self.id,
                        "device_id": device_id,
                        "channel": channel,
                        "index": index,
                        "count": chunk,
                    }),
                )
                .await?;

            let part: ChannelData = response.parse()?;
            match &mut data {
                Some(data) => data.values.extend(part.values),
                None => data = Some(part),
            }

            count -= chunk;
            index += chunk;
        }

        Ok(data.unwrap_or_default())
    }

    /// Get information for a channel in the recording.
    pub async fn get_channel_info(&self, device_id: &str, channel: Channel) -> Result<Value> {
        let response = self
            .request(
                "recording_get_channel_info",
                json!({
                    "recording_id": self.id,
                    "device_id": device_id,
                    "channel": channel,
                }),
            )
            .await?;
        Ok(response.data)
    }

    /// Get statistics for a channel over the `from`–`to` selection, in
    /// seconds.
    pub async fn get_channel_statistics(
        &self,
        device_id: &str,
        channel: Channel,
        from: f64,
        to: f64,
    ) -> Result<Value> {
        let response = self
            .request(
                "recording_get_channel_statistics",
                json!({
                    "recording_id": self.id,
                    "device_id": device_id,
                    "channel": channel,
                    "from": from,
                    "to": to,
                }),
            )
            .await?;
        Ok(response.data)
    }

    /// Get the offset of a log in microseconds. `device_id` is `None` for
    /// imported logs; the channel is then the log id from `import_log`.
    pub async fn get_log_offset(
        &self,
        device_id: Option<&str>,
        channel: Channel,
    ) -> Result<i64> {
        let mut data = json!({ "recording_id": self.id, "channel": channel });
        if let Some(device_id) = device_id {
            data["device_id"] = json!(device_id);
        }

        let response = self.request("recording_get_log_offset", data).await?;
        response.field("offset")
    }

    /// Get the offset of the recording in microseconds.
    pub async fn get_offset(&self) -> Result<i64> {
        let response = self
            .request("recording_get_offset", json!({ "recording_id": self.id }))
            .await?;
        response.field("offset")
    }

    /// Import a log file into the recording, returning the log id.
    pub async fn import_log(&self, filename: &str, converter: &str) -> Result<String> {
        let response = self
            .request_blocking(
                "recording_import_log",
                json!({
                    "recording_id": self.id,
                    "filename": filename,
                    "converter": converter,
                }),
            )
            .await?;
        response.field("log_id")
    }

    /// Check if the recording is ongoing.
    pub async fn is_running(&self) -> Result<bool> {
        let response = self
            .request("recording_is_running", json!({ "recording_id": self.id }))
            .await?;
        response.field("running")
    }

    /// Add timestamped text to the recording's log window. The timestamp
    /// is in milliseconds since 1970-01-01; 0 uses the current time. A
    /// recording has to be running for this to produce any output.
    pub async fn log(&self, text: &str, timestamp: i64) -> Result<()> {
        self.request(
            "recording_log",
            json!({
                "recording_id": self.id,
                "text": text,
                "timestamp": timestamp,
            }),
        )
        .await?;
        Ok(())
    }

    /// Change the name of the recording.
    pub async fn rename(&mut self, name: &str) -> Result<()> {
        self.request(
            "recording_rename",
            json!({ "recording_id": self.id, "name": name }),
        )
        .await?;
        self.name = name.to_string();
        Ok(())
    }

    /// Set the offset of a log in microseconds. `device_id` is `None` for
    /// imported logs.
    pub async fn set_log_offset(
        &self,
        device_id: Option<&str>,
        channel: Channel,
        offset: i64,
    ) -> Result<()> {
        let mut data = json!({
            "recording_id": self.id,
            "channel": channel,
            "offset": offset,
        });
        if let Some(device_id) = device_id {
            data["device_id"] = json!(device_id);
        }

        self.request("recording_set_log_offset", data).await?;
        Ok(())
    }

    /// Set the offset of the recording in microseconds.
    pub async fn set_offset(&self, offset: i64) -> Result<()> {
        self.request(
            "recording_set_offset",
            json!({ "recording_id": self.id, "offset": offset }),
        )
        .await?;
        Ok(())
    }
}

fn remove_control_characters(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_control()).collect()
}
