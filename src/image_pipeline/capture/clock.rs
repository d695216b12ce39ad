//! Conversion of sensor timestamps (nanoseconds since boot) to UTC.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};

const PROC_STAT: &str = "/proc/stat";
/// Created by systemd-timesyncd once the system clock has been synchronized.
const TIMESYNC_MARKER: &str = "/run/systemd/timesync/synchronized";

/// Boot instant used to place sensor timestamps on the UTC timeline.
///
/// Boards without a real-time clock boot with a stale wall clock, so a boot
/// time taken before NTP synchronization can be far off. The flag records
/// whether the caller trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorClock {
    boot_time: DateTime<Utc>,
    synchronized: bool,
}

impl SensorClock {
    pub fn from_boot_time(boot_time: DateTime<Utc>, synchronized: bool) -> Self {
        Self {
            boot_time,
            synchronized,
        }
    }

    /// Boot time derived from a trusted `now` and the time since boot.
    pub fn from_uptime(now: DateTime<Utc>, uptime: Duration) -> Result<Self> {
        let uptime = chrono::Duration::from_std(uptime)
            .map_err(|e| ConversionError::InvalidParameter(format!("uptime out of range: {e}")))?;
        Ok(Self::from_boot_time(now - uptime, true))
    }

    pub fn unsynchronized(boot_time: DateTime<Utc>) -> Self {
        Self::from_boot_time(boot_time, false)
    }

    /// Reads the kernel boot time and the timesyncd status of this host.
    pub fn system() -> Result<Self> {
        let stat = std::fs::read_to_string(PROC_STAT)
            .map_err(|e| ConversionError::CaptureError(format!("{PROC_STAT}: {e}")))?;
        let boot_time = parse_btime(&stat)?;
        let synchronized = Path::new(TIMESYNC_MARKER).exists();
        debug!(%boot_time, synchronized, "System clock read");
        Ok(Self::from_boot_time(boot_time, synchronized))
    }

    pub fn boot_time(&self) -> DateTime<Utc> {
        self.boot_time
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn sensor_time_to_utc(&self, sensor_timestamp_ns: u64) -> DateTime<Utc> {
        if !self.synchronized {
            warn!(sensor_timestamp_ns, "Converting sensor timestamp with an unsynchronized clock");
        }
        // i64 nanoseconds cover ~292 years of uptime
        let offset = chrono::Duration::nanoseconds(sensor_timestamp_ns.min(i64::MAX as u64) as i64);
        self.boot_time + offset
    }
}

fn parse_btime(stat: &str) -> Result<DateTime<Utc>> {
    let seconds: i64 = stat
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| ConversionError::CaptureError(format!("no btime entry in {PROC_STAT}")))?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| ConversionError::CaptureError(format!("boot time {seconds} out of range")))
}

/// `YYYY-MM-DDTHH:MM:SS.ffffff`, the layout FITS `DATE` cards expect.
pub fn iso_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
