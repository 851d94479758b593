//! Device directory, live streams and event history

use crate::client::EufyClient;
use crate::error::{EufyError, Result};
use crate::types::{Device, DeviceIdentifiers, HistoryQuery, HistoryRecord, StreamHandle};
use serde::{Deserialize, Serialize};

pub(crate) const DEVICE_LIST_PATH: &str = "app/get_devs_list";
pub(crate) const START_STREAM_PATH: &str = "web/equipment/start_stream";
pub(crate) const STOP_STREAM_PATH: &str = "web/equipment/stop_stream";
pub(crate) const HISTORY_PATH: &str = "event/app/get_all_history_record";

/// Look a device up by its exact display name
pub fn find_in(devices: &[Device], name: &str) -> Result<Device> {
    devices
        .iter()
        .find(|device| device.device_name == name)
        .cloned()
        .ok_or_else(|| EufyError::DeviceNotFound(name.to_string()))
}

impl EufyClient {
    /// All devices registered to the account
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        self.ensure_authenticated().await?;

        let response = self.post(DEVICE_LIST_PATH, &serde_json::json!({})).await?;
        let devices: Option<Vec<Device>> = response.into_data()?;
        let devices = devices.unwrap_or_default();

        tracing::debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    /// Find a device by name; a miss is `EufyError::DeviceNotFound`
    pub async fn find_device(&self, name: &str) -> Result<Device> {
        let devices = self.list_devices().await?;
        find_in(&devices, name)
    }

    /// Start a live stream for the named device
    pub async fn start_stream(&self, device_name: &str) -> Result<StreamHandle> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StreamData {
            Object { url: String },
            Url(String),
        }

        let device = self.find_device(device_name).await?;
        let identifiers = DeviceIdentifiers::from(&device);

        let response = self.post(START_STREAM_PATH, &identifiers).await?;
        let url = match response.into_data::<Option<StreamData>>()? {
            Some(StreamData::Object { url }) | Some(StreamData::Url(url)) => url,
            None => String::new(),
        };

        if url.is_empty() {
            return Err(EufyError::Protocol(format!(
                "no stream url returned for {}",
                device_name
            )));
        }

        tracing::info!(device = %device_name, device_sn = %device.device_sn, "Stream started");
        Ok(StreamHandle {
            url,
            device: identifiers,
        })
    }

    /// Stop a stream started with [`start_stream`](Self::start_stream)
    pub async fn stop_stream(&self, stream: &StreamHandle) -> Result<()> {
        self.ensure_authenticated().await?;

        let response = self.post(STOP_STREAM_PATH, &stream.device).await?;
        response.check()?;

        tracing::info!(device_sn = %stream.device.device_sn, "Stream stopped");
        Ok(())
    }

    /// Recorded events for the named device within the query window
    pub async fn history(&self, device_name: &str, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        #[derive(Serialize)]
        struct HistoryRequest<'a> {
            device_sn: &'a str,
            station_sn: &'a str,
            start_time: i64,
            end_time: i64,
            num: u32,
            id: u32,
            id_type: u32,
            is_favorite: bool,
            pullup: bool,
            shared: bool,
            storage: u32,
        }

        let device = self.find_device(device_name).await?;

        let request = HistoryRequest {
            device_sn: &device.device_sn,
            station_sn: &device.station_sn,
            start_time: query.start.timestamp(),
            end_time: query.end.timestamp(),
            num: query.limit,
            id: 0,
            id_type: 1,
            is_favorite: false,
            pullup: true,
            shared: true,
            storage: 0,
        };

        let response = self.post(HISTORY_PATH, &request).await?;
        let records: Option<Vec<HistoryRecord>> = response.into_data()?;
        let records = records.unwrap_or_default();

        tracing::debug!(device = %device_name, count = records.len(), "Fetched history");
        Ok(records)
    }
}
