mod connection;
mod message;

mod arc;
mod recording;
mod toggle;

mod error;
pub use error::Error;

pub use arc::{
    Arc, BatteryData, BatteryProfileStep, Channel, DeviceInfo, FourWireState, MeasurementRange,
    PowerRegulation, Supply, Version,
};
pub use connection::Connection;
pub use message::{ErrorResponse, Request, ResponseBody};
pub use recording::{ChannelData, Recording, RecordingInfo};
pub use toggle::Toggle;

pub type Result<T> = std::result::Result<T, Error>;
