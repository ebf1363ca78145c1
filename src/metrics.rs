/*
 *  metrics.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! Host telemetry gathered from /proc and /sys, plus the container runtime.

use std::collections::HashSet;
use std::ffi::CString;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::process::Command;

use crate::config::TelemetryConfig;
use crate::display::error::SnapshotError;

/// One mounted filesystem
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilesystemEntry {
    pub mount: String,
    pub used_bytes: u64,
    pub use_percent: f64,
}

/// Everything one dashboard cycle needs, fetched in a single call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// CPU load, 0-100
    pub cpu_load: f64,
    /// Celsius, `None` when no sensor is readable
    pub cpu_temp: Option<f64>,
    pub mem_active: u64,
    pub mem_total: u64,
    pub filesystems: Vec<FilesystemEntry>,
    /// Running containers, `None` when the runtime is unavailable
    pub containers: Option<usize>,
    pub uptime_secs: u64,
}

impl TelemetrySnapshot {
    pub fn container_count(&self) -> usize {
        self.containers.unwrap_or(0)
    }

    /// The filesystem mounted at "/", or the first entry when there is none
    pub fn root_filesystem(&self) -> Option<&FilesystemEntry> {
        self.filesystems
            .iter()
            .find(|fs| fs.mount == "/")
            .or_else(|| self.filesystems.first())
    }
}

/// Provider of telemetry snapshots
pub trait TelemetrySource: Send {
    fn snapshot(&mut self) -> impl Future<Output = Result<TelemetrySnapshot, SnapshotError>> + Send;
}

/// Aggregate CPU jiffies from the first line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Busy percentage between an earlier sample and this one
    pub fn load_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(earlier.total);
        let idle = self.idle.saturating_sub(earlier.idle);
        if total == 0 {
            return 0.0;
        }
        (total.saturating_sub(idle) as f64 / total as f64) * 100.0
    }
}

pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes, SnapshotError> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| parse_error("/proc/stat", "no aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| parse_error("/proc/stat", e))?;

    if fields.len() < 4 {
        return Err(parse_error("/proc/stat", "too few cpu fields"));
    }

    // user nice system idle iowait irq softirq steal; guest time is already in user
    let counted = &fields[..fields.len().min(8)];
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes { idle, total: counted.iter().sum() })
}

/// Returns (total, active) bytes. Active is what is not available for new allocations.
pub fn parse_meminfo(meminfo: &str) -> Result<(u64, u64), SnapshotError> {
    let mut total = None;
    let mut available = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in meminfo.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let kib: u64 = match value.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        match key {
            "MemTotal:" => total = Some(kib),
            "MemAvailable:" => available = Some(kib),
            "MemFree:" => free = kib,
            "Buffers:" => buffers = kib,
            "Cached:" => cached = kib,
            _ => {}
        }
    }

    let total = total.ok_or_else(|| parse_error("/proc/meminfo", "missing MemTotal"))?;
    // kernels before 3.14 have no MemAvailable
    let available = available.unwrap_or(free + buffers + cached).min(total);
    Ok((total * 1024, (total - available) * 1024))
}

pub fn parse_uptime(uptime: &str) -> Result<u64, SnapshotError> {
    let first = uptime
        .split_whitespace()
        .next()
        .ok_or_else(|| parse_error("/proc/uptime", "empty"))?;
    let secs: f64 = first.parse().map_err(|e| parse_error("/proc/uptime", e))?;
    Ok(secs.max(0.0) as u64)
}

/// Mount points of real block devices, first mount of each device wins
pub fn parse_mounts(mounts: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in mounts.lines() {
        let mut parts = line.split_whitespace();
        let (Some(device), Some(mount)) = (parts.next(), parts.next()) else {
            continue;
        };
        if !device.starts_with("/dev/") || device.starts_with("/dev/loop") {
            continue;
        }
        if seen.insert(device.to_string()) {
            out.push(unescape_mount(mount));
        }
    }
    out
}

// /proc/mounts escapes space, tab, newline and backslash as \ooo
fn unescape_mount(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let code = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                out.push(code as u8);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn parse_error(what: &'static str, detail: impl ToString) -> SnapshotError {
    SnapshotError::Parse { what, detail: detail.to_string() }
}

fn read_file(path: &Path) -> Result<String, SnapshotError> {
    fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Usage of the filesystem holding `mount`, df style
fn filesystem_usage(mount: &str) -> Result<FilesystemEntry, SnapshotError> {
    let io_error = |source| SnapshotError::Io { path: mount.to_string(), source };
    let c_path = CString::new(mount)
        .map_err(|e| io_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    // SAFETY: statvfs only writes into the zeroed struct we own, c_path outlives the call
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io_error(std::io::Error::last_os_error()));
    }

    let fragment = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * fragment;
    let free = stat.f_bfree as u64 * fragment;
    let avail = stat.f_bavail as u64 * fragment;
    let used = total.saturating_sub(free);
    let usable = used + avail;

    Ok(FilesystemEntry {
        mount: mount.to_string(),
        used_bytes: used,
        use_percent: if usable > 0 { used as f64 / usable as f64 * 100.0 } else { 0.0 },
    })
}

/// Count running containers with `<runtime> ps -q`
async fn count_containers(runtime: &str) -> Option<usize> {
    match Command::new(runtime).args(["ps", "-q"]).output().await {
        Ok(output) if output.status.success() => {
            let listing = String::from_utf8_lossy(&output.stdout);
            Some(listing.lines().filter(|l| !l.trim().is_empty()).count())
        }
        Ok(output) => {
            debug!("{} ps exited with {}", runtime, output.status);
            None
        }
        Err(e) => {
            debug!("{} unavailable: {}", runtime, e);
            None
        }
    }
}

/// Live metrics of the machine we run on
pub struct SystemMetrics {
    proc_root: PathBuf,
    thermal_zone: PathBuf,
    container_runtime: Option<String>,
    last_cpu: Option<CpuTimes>,
}

impl SystemMetrics {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            thermal_zone: config.thermal_zone_path(),
            container_runtime: config.container_runtime(),
            last_cpu: None,
        }
    }

    /// Busy percentage since the previous call, or since boot on the first call
    fn cpu_load(&mut self) -> Result<f64, SnapshotError> {
        let now = parse_cpu_times(&read_file(&self.proc_root.join("stat"))?)?;
        let earlier = self.last_cpu.replace(now).unwrap_or_default();
        Ok(now.load_since(&earlier))
    }

    /// The value is in millidegrees Celsius.
    fn cpu_temp(&self) -> Option<f64> {
        let content = fs::read_to_string(&self.thermal_zone).ok()?;
        let millideg: f64 = content.trim().parse().ok()?;
        Some(millideg / 1000.0)
    }

    fn filesystems(&self) -> Result<Vec<FilesystemEntry>, SnapshotError> {
        let mounts = parse_mounts(&read_file(&self.proc_root.join("mounts"))?);
        let mut entries = Vec::with_capacity(mounts.len());
        for mount in mounts {
            match filesystem_usage(&mount) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping {}: {}", mount, e),
            }
        }
        Ok(entries)
    }
}

impl TelemetrySource for SystemMetrics {
    async fn snapshot(&mut self) -> Result<TelemetrySnapshot, SnapshotError> {
        let cpu_load = self.cpu_load()?;
        let cpu_temp = self.cpu_temp();
        let (mem_total, mem_active) = parse_meminfo(&read_file(&self.proc_root.join("meminfo"))?)?;
        let filesystems = self.filesystems()?;
        let uptime_secs = parse_uptime(&read_file(&self.proc_root.join("uptime"))?)?;

        let containers = match self.container_runtime.as_deref() {
            Some(runtime) => count_containers(runtime).await,
            None => None,
        };

        Ok(TelemetrySnapshot {
            cpu_load,
            cpu_temp,
            mem_active,
            mem_total,
            filesystems,
            containers,
            uptime_secs,
        })
    }
}
