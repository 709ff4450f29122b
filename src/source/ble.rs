//! Live source: a BLE sensor streaming either Polar PMD PPI frames or
//! standard Heart Rate Measurement notifications.

use std::time::{Duration, Instant};

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use clap::ValueEnum;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time;
use uuid::{uuid, Uuid};

use super::SourceError;
use crate::heart_rate::HeartRate;
use crate::pmd::{self, PpiFrame};
use crate::record::PpiRecord;

pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");
pub const PMD_CONTROL: Uuid = uuid!("fb005c81-02e7-f387-1cad-8acd2d8df0c8");
pub const PMD_DATA: Uuid = uuid!("fb005c82-02e7-f387-1cad-8acd2d8df0c8");

/// Marks intervals invalid while the sensor is still settling: for a while
/// after subscribing, and again after any notification without RR data.
#[derive(Debug, Clone)]
pub struct Settling {
    started: Instant,
    last_blank: Option<Instant>,
    warmup: Duration,
    after_blank: Duration,
}

impl Settling {
    pub fn new(now: Instant, warmup: Duration, after_blank: Duration) -> Self {
        Self {
            started: now,
            last_blank: None,
            warmup,
            after_blank,
        }
    }

    pub fn blank(&mut self, now: Instant) {
        self.last_blank = Some(now);
    }

    pub fn is_stable(&self, now: Instant) -> bool {
        if now.duration_since(self.started) <= self.warmup {
            return false;
        }
        match self.last_blank {
            Some(t) => now.duration_since(t) > self.after_blank,
            None => true,
        }
    }
}

async fn find_matching_peripheral_by_local_name(
    central: &Adapter,
    pattern: &str,
) -> Result<Option<Peripheral>, SourceError> {
    for p in central.peripherals().await? {
        let matches = p
            .properties()
            .await?
            .and_then(|props| props.local_name)
            .map_or(false, |name| name.contains(pattern));
        if matches {
            return Ok(Some(p));
        }
    }
    Ok(None)
}

/// Which characteristic carries the intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// Polar Measurement Data PPI stream (optical sensors)
    Pmd,
    /// Standard Heart Rate Measurement RR intervals (chest straps)
    Hrm,
}

async fn connect(central: &Adapter, pattern: &str, scan_for: Duration) -> Result<Peripheral, SourceError> {
    central.start_scan(ScanFilter::default()).await?;
    time::sleep(scan_for).await;

    let peripheral = find_matching_peripheral_by_local_name(central, pattern)
        .await?
        .ok_or_else(|| SourceError::PeripheralNotFound(pattern.to_string()))?;
    central.stop_scan().await?;
    peripheral.connect().await?;
    peripheral.discover_services().await?;
    Ok(peripheral)
}

fn characteristic(peripheral: &Peripheral, uuid: Uuid) -> Result<Characteristic, SourceError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or(SourceError::MissingCharacteristic(uuid))
}

/// Connect to the first peripheral whose name contains `pattern` and forward
/// its intervals into `tx` until the device disconnects or the queue closes.
pub async fn stream(
    protocol: Protocol,
    pattern: &str,
    scan_for: Duration,
    tx: mpsc::Sender<PpiRecord>,
) -> Result<(), SourceError> {
    let manager = Manager::new().await?;
    let central = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or(SourceError::NoAdapter)?;
    let peripheral = connect(&central, pattern, scan_for).await?;

    let delivered = match protocol {
        Protocol::Pmd => stream_ppi(&peripheral, &tx).await?,
        Protocol::Hrm => stream_heart_rate(&peripheral, &tx).await?,
    };
    if delivered {
        tracing::info!("peripheral notification stream ended");
    } else {
        tracing::info!("measurement queue closed, disconnecting");
        peripheral.disconnect().await?;
    }
    Ok(())
}

/// Start the PMD PPI measurement and forward each sample. Returns `false`
/// once the queue has closed.
async fn stream_ppi(peripheral: &Peripheral, tx: &mpsc::Sender<PpiRecord>) -> Result<bool, SourceError> {
    let control = characteristic(peripheral, PMD_CONTROL)?;
    let data = characteristic(peripheral, PMD_DATA)?;
    peripheral.subscribe(&data).await?;
    peripheral.subscribe(&control).await?;
    let mut notifications = peripheral.notifications().await?;

    peripheral.write(&control, &pmd::START_PPI, WriteType::WithResponse).await?;
    peripheral.write(&control, &pmd::GET_PPI_SETTINGS, WriteType::WithResponse).await?;
    tracing::info!("started PPI measurement");

    while let Some(notification) = notifications.next().await {
        if notification.uuid == PMD_CONTROL {
            tracing::debug!(raw = %hex::encode(&notification.value), "control point response");
            continue;
        }
        if notification.uuid != PMD_DATA {
            continue;
        }
        let frame = match PpiFrame::new(&notification.value) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%err, raw = %hex::encode(&notification.value), "skipping PMD frame");
                continue;
            }
        };
        tracing::debug!(
            samples = frame.samples().len(),
            raw = %hex::encode(&notification.value),
            "PPI frame"
        );
        for record in frame.records() {
            if tx.send(record).await.is_err() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

async fn stream_heart_rate(peripheral: &Peripheral, tx: &mpsc::Sender<PpiRecord>) -> Result<bool, SourceError> {
    let measurement = characteristic(peripheral, HEART_RATE_MEASUREMENT)?;
    peripheral.subscribe(&measurement).await?;
    tracing::info!("subscribed to heart rate measurements");

    let mut notifications = peripheral.notifications().await?;
    let mut settling = Settling::new(Instant::now(), Duration::from_secs(5), Duration::from_secs(3));

    while let Some(notification) = notifications.next().await {
        if notification.uuid != HEART_RATE_MEASUREMENT {
            continue;
        }
        let heart_rate = match HeartRate::new(&notification.value) {
            Ok(hr) => hr,
            Err(err) => {
                tracing::warn!(%err, raw = %hex::encode(&notification.value), "skipping notification");
                continue;
            }
        };

        let now = Instant::now();
        if heart_rate.rr().is_empty() {
            tracing::debug!("heart rate reading with no R-R interval");
            settling.blank(now);
            continue;
        }
        let stable = settling.is_stable(now);
        tracing::debug!(
            bpm = heart_rate.bpm(),
            stable,
            raw = %hex::encode(&notification.value),
            "heart rate notification"
        );

        for mut record in heart_rate.records() {
            record.valid &= stable;
            if tx.send(record).await.is_err() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
