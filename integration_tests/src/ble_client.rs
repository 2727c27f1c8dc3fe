//! BLE central used to exercise the peripheral's connection lifecycle.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use uuid::Uuid;

/// Device Information Service characteristics
pub const MANUFACTURER_NAME_UUID: Uuid = Uuid::from_u128(0x00002a29_0000_1000_8000_00805f9b34fb);
pub const MODEL_NUMBER_UUID: Uuid = Uuid::from_u128(0x00002a24_0000_1000_8000_00805f9b34fb);
pub const FIRMWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x00002a26_0000_1000_8000_00805f9b34fb);

/// Polling interval while scanning or watching the link
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// BLE central bound to the first local adapter.
pub struct BleClient {
    adapter: Adapter,
    name: String,
    peripheral: Option<Peripheral>,
}

impl BleClient {
    pub async fn new(name: &str) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        Ok(Self {
            adapter,
            name: name.to_string(),
            peripheral: None,
        })
    }

    /// Scan until the device shows up advertising, returning how long it took.
    pub async fn wait_for_advertising(&mut self, scan_timeout: Duration) -> Result<Duration> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        let start = Instant::now();
        let found = self.find_by_name(start, scan_timeout).await;
        self.adapter.stop_scan().await?;

        self.peripheral = Some(found?);
        Ok(start.elapsed())
    }

    async fn find_by_name(&self, start: Instant, scan_timeout: Duration) -> Result<Peripheral> {
        while start.elapsed() < scan_timeout {
            for peripheral in self.adapter.peripherals().await? {
                if peripheral.is_connected().await? {
                    continue;
                }
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(self.name.as_str()) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }

        Err(anyhow!("Device '{}' not advertising within timeout", self.name))
    }

    fn peripheral(&self) -> Result<&Peripheral> {
        self.peripheral
            .as_ref()
            .ok_or_else(|| anyhow!("Device '{}' has not been found yet", self.name))
    }

    /// Connect to the device found by the last scan and discover services.
    pub async fn connect(&self) -> Result<()> {
        let peripheral = self.peripheral()?;
        peripheral.connect().await?;
        peripheral.discover_services().await?;
        Ok(())
    }

    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral()?.is_connected().await?)
    }

    /// Stay connected for `hold`, failing as soon as the link drops.
    pub async fn hold_link(&self, hold: Duration) -> Result<()> {
        let start = Instant::now();
        while start.elapsed() < hold {
            if !self.is_connected().await? {
                return Err(anyhow!(
                    "Link dropped after {:.1}s",
                    start.elapsed().as_secs_f32()
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.peripheral()?
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| anyhow!("Characteristic {} not found", uuid))
    }

    /// Read a UTF-8 string characteristic.
    pub async fn read_string(&self, uuid: Uuid) -> Result<String> {
        let characteristic = self.characteristic(uuid)?;
        let value = self.peripheral()?.read(&characteristic).await?;
        Ok(String::from_utf8(value)?)
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral()?.disconnect().await?;
        Ok(())
    }
}
