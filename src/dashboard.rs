/*
 *  dashboard.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Two-page dashboard scheduler - fetch a snapshot, render one page,
 *  rotate, and never let a failed cycle stop the loop
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

use std::future::Future;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::MissedTickBehavior;

use crate::display::error::{CycleError, SnapshotError};
use crate::display::traits::CharacterDisplay;
use crate::func_timer::FunctionTimer;
use crate::glyphs::Icon;
use crate::metrics::{TelemetrySnapshot, TelemetrySource};

const GIB: f64 = (1u64 << 30) as f64;
const DAY_SECS: u64 = 24 * 3600;

/// Shown after a failed cycle
pub const ERROR_TEXT: &str = "Error Occurred";

/// Which of the two layouts is drawn next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// CPU load and temperature, memory
    System,
    /// Root disk, containers and uptime
    Storage,
}

impl Page {
    pub fn next(self) -> Page {
        match self {
            Page::System => Page::Storage,
            Page::Storage => Page::System,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Page::System => 0,
            Page::Storage => 1,
        }
    }
}

/// A piece of one row: a CGRAM icon or plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Icon(Icon),
    Text(String),
}

pub type Row = Vec<Segment>;

/// Compact uptime for a 16 column row.
///
/// Each unit is floor(total / unit), not a remainder cascade, so 5410s is "1h".
pub fn format_uptime(total_secs: u64) -> String {
    let days = total_secs / DAY_SECS;
    let hours = total_secs / 3600;
    let mins = total_secs / 60;

    if days > 99 {
        "99d+".to_string()
    } else if days > 0 {
        format!("{}d", days)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", mins)
    }
}

// halves round up, -2.5 -> -2
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn pad2(value: f64) -> String {
    format!("{:>2}", round_half_up(value))
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}

/// Both rows of a page for one snapshot
pub fn page_rows(page: Page, snapshot: &TelemetrySnapshot) -> Result<[Row; 2], SnapshotError> {
    match page {
        Page::System => {
            let temp = round_half_up(snapshot.cpu_temp.unwrap_or(0.0));
            let mem_pct = percent(snapshot.mem_active, snapshot.mem_total);
            let mem_tenths = round_half_up(snapshot.mem_active as f64 / GIB * 10.0);
            Ok([
                vec![
                    Segment::Icon(Icon::Cpu),
                    Segment::Text(format!("{}% ", pad2(snapshot.cpu_load))),
                    Segment::Icon(Icon::Thermometer),
                    Segment::Text(format!("{}C", temp)),
                ],
                vec![
                    Segment::Icon(Icon::Memory),
                    Segment::Text(format!("{}% {}.{}GB", pad2(mem_pct), mem_tenths / 10, mem_tenths % 10)),
                ],
            ])
        }
        Page::Storage => {
            let root = snapshot.root_filesystem().ok_or(SnapshotError::NoFilesystems)?;
            let disk_gib = round_half_up(root.used_bytes as f64 / GIB);
            Ok([
                vec![
                    Segment::Icon(Icon::Disk),
                    Segment::Text(format!("{}% {}GB", pad2(root.use_percent), disk_gib)),
                ],
                vec![
                    Segment::Icon(Icon::Container),
                    Segment::Text(format!(
                        "{}  UP:{}",
                        snapshot.container_count(),
                        format_uptime(snapshot.uptime_secs)
                    )),
                ],
            ])
        }
    }
}

/// Clear and draw one page
pub fn render_page<D: CharacterDisplay + ?Sized>(
    display: &mut D,
    page: Page,
    snapshot: &TelemetrySnapshot,
) -> Result<(), CycleError> {
    let rows = page_rows(page, snapshot)?;

    let (_, visible_rows) = display.dimensions();

    display.clear()?;
    for (row, segments) in (0..visible_rows).zip(rows.iter()) {
        display.set_cursor(0, row)?;
        for segment in segments {
            match segment {
                Segment::Icon(icon) => display.write(icon.slot())?,
                Segment::Text(text) => display.print(text)?,
            }
        }
    }
    Ok(())
}

/// Periodic two-page renderer.
///
/// Owns the page state; the display session and telemetry source are lent
/// to it per cycle so nothing else can write the bus while a cycle runs.
#[derive(Debug)]
pub struct DashboardScheduler {
    page: Page,
    cycles: u64,
    failures: u64,
}

impl Default for DashboardScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardScheduler {
    pub fn new() -> Self {
        Self {
            page: Page::System,
            cycles: 0,
            failures: 0,
        }
    }

    /// Page the next cycle will draw
    pub fn current_page(&self) -> Page {
        self.page
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Fetch, render and rotate. The page only advances on success.
    pub async fn run_cycle<D, S>(&mut self, display: &mut D, source: &mut S) -> Result<(), CycleError>
    where
        D: CharacterDisplay + ?Sized,
        S: TelemetrySource + ?Sized,
    {
        let snapshot = source.snapshot().await?;
        render_page(display, self.page, &snapshot)?;

        debug!("Rendered page {}", self.page.index());
        self.page = self.page.next();
        Ok(())
    }

    /// One isolated cycle: failures are logged and replaced by the error text.
    ///
    /// Returns true when the page rendered.
    pub async fn tick<D, S>(&mut self, display: &mut D, source: &mut S, budget: Duration) -> bool
    where
        D: CharacterDisplay + ?Sized,
        S: TelemetrySource + ?Sized,
    {
        let _timer = FunctionTimer::with_budget("dashboard cycle", budget);
        self.cycles += 1;

        match self.run_cycle(display, source).await {
            Ok(()) => true,
            Err(e) => {
                self.failures += 1;
                error!("Update Error: {}", e);
                if let Err(e) = show_error(display) {
                    warn!("Unable to show error on display: {}", e);
                }
                false
            }
        }
    }

    /// Run a cycle now and then once per `interval` until `shutdown` resolves.
    ///
    /// Each cycle is awaited before the next tick is taken, and late ticks are
    /// pushed back rather than bunched, so cycles never overlap on the bus.
    pub async fn run<D, S, F>(&mut self, display: &mut D, source: &mut S, interval: Duration, shutdown: F)
    where
        D: CharacterDisplay + ?Sized,
        S: TelemetrySource + ?Sized,
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Dashboard running, page every {:?}", interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Dashboard stopping after {} cycles ({} failed)", self.cycles, self.failures);
                    break;
                }
                _ = ticker.tick() => {
                    self.tick(display, source, interval).await;
                }
            }
        }
    }
}

fn show_error<D: CharacterDisplay + ?Sized>(display: &mut D) -> Result<(), CycleError> {
    display.clear()?;
    display.print(ERROR_TEXT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::hd44780::Hd44780;
    use crate::display::drivers::mock::{MockBus, MockDelay};
    use crate::metrics::FilesystemEntry;

    struct FixedSource {
        snapshot: TelemetrySnapshot,
        fail: bool,
        calls: usize,
    }

    impl FixedSource {
        fn new(snapshot: TelemetrySnapshot) -> Self {
            Self { snapshot, fail: false, calls: 0 }
        }
    }

    impl TelemetrySource for FixedSource {
        async fn snapshot(&mut self) -> Result<TelemetrySnapshot, SnapshotError> {
            self.calls += 1;
            if self.fail {
                return Err(SnapshotError::Parse { what: "test", detail: "forced".into() });
            }
            Ok(self.snapshot.clone())
        }
    }

    fn sample() -> TelemetrySnapshot {
        TelemetrySnapshot {
            cpu_load: 7.0,
            cpu_temp: Some(45.4),
            mem_active: 2 << 30,
            mem_total: 4 << 30,
            filesystems: vec![FilesystemEntry {
                mount: "/".into(),
                used_bytes: 100 << 30,
                use_percent: 55.2,
            }],
            containers: Some(3),
            uptime_secs: 5 * 3600 + 10,
        }
    }

    fn text_of(row: &Row) -> String {
        row.iter()
            .map(|s| match s {
                Segment::Icon(icon) => format!("[{}]", icon.label()),
                Segment::Text(t) => t.clone(),
            })
            .collect()
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0m");
        assert_eq!(format_uptime(59), "0m");
        assert_eq!(format_uptime(60), "1m");
        assert_eq!(format_uptime(3661), "1h");
        assert_eq!(format_uptime(5410), "1h");
        assert_eq!(format_uptime(90000), "1d");
        assert_eq!(format_uptime(99 * 86400), "99d");
        assert_eq!(format_uptime(100 * 86400 + 10), "99d+");
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(44.5), 45);
        assert_eq!(round_half_up(45.4), 45);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(pad2(7.0), " 7");
        assert_eq!(pad2(100.0), "100");
    }

    #[test]
    fn test_system_page_rows() {
        let rows = page_rows(Page::System, &sample()).unwrap();
        assert_eq!(text_of(&rows[0]), "[CPU] 7% [TEMP]45C");
        assert_eq!(text_of(&rows[1]), "[RAM]50% 2.0GB");
    }

    #[test]
    fn test_storage_page_rows() {
        let rows = page_rows(Page::Storage, &sample()).unwrap();
        assert_eq!(text_of(&rows[0]), "[DISK]55% 100GB");
        assert_eq!(text_of(&rows[1]), "[CONTAINER]3  UP:5h");
    }

    #[test]
    fn test_missing_sensor_and_runtime_show_zero() {
        let snapshot = TelemetrySnapshot { cpu_temp: None, containers: None, ..sample() };
        let system = page_rows(Page::System, &snapshot).unwrap();
        assert_eq!(text_of(&system[0]), "[CPU] 7% [TEMP]0C");
        let storage = page_rows(Page::Storage, &snapshot).unwrap();
        assert_eq!(text_of(&storage[1]), "[CONTAINER]0  UP:5h");
    }

    #[test]
    fn test_memory_tenths_round_half_up() {
        // 2.25 GiB and 0.25 GiB are exact ties
        for (active, expected) in [(9u64 << 28, "2.3GB"), (1 << 28, "0.3GB"), (3 << 28, "0.8GB")] {
            let snapshot = TelemetrySnapshot { mem_active: active, ..sample() };
            let rows = page_rows(Page::System, &snapshot).unwrap();
            assert!(text_of(&rows[1]).ends_with(expected), "{}", text_of(&rows[1]));
        }
    }

    #[test]
    fn test_zero_memory_total() {
        let snapshot = TelemetrySnapshot { mem_active: 0, mem_total: 0, ..sample() };
        let rows = page_rows(Page::System, &snapshot).unwrap();
        assert_eq!(text_of(&rows[1]), "[RAM] 0% 0.0GB");
    }

    #[test]
    fn test_storage_needs_a_filesystem() {
        let snapshot = TelemetrySnapshot { filesystems: vec![], ..sample() };
        assert!(matches!(
            page_rows(Page::Storage, &snapshot),
            Err(SnapshotError::NoFilesystems)
        ));
        // the system page does not care
        assert!(page_rows(Page::System, &snapshot).is_ok());
    }

    #[tokio::test]
    async fn test_pages_alternate() {
        let bus = MockBus::new();
        let mut lcd = Hd44780::new(bus.clone(), MockDelay::new(), 0x27);
        let mut source = FixedSource::new(sample());
        let mut dashboard = DashboardScheduler::new();

        for n in 1..=5u8 {
            dashboard.run_cycle(&mut lcd, &mut source).await.unwrap();
            assert_eq!(dashboard.current_page().index(), n % 2);
        }
        assert_eq!(source.calls, 5);
    }

    #[tokio::test]
    async fn test_snapshot_failure_keeps_page() {
        let bus = MockBus::new();
        let mut lcd = Hd44780::new(bus.clone(), MockDelay::new(), 0x27);
        let mut source = FixedSource::new(sample());
        let mut dashboard = DashboardScheduler::new();

        assert!(dashboard.tick(&mut lcd, &mut source, Duration::from_secs(3)).await);
        assert_eq!(dashboard.current_page(), Page::Storage);

        source.fail = true;
        assert!(!dashboard.tick(&mut lcd, &mut source, Duration::from_secs(3)).await);
        assert_eq!(dashboard.current_page(), Page::Storage);
        assert_eq!(dashboard.failures(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let bus = MockBus::new();
        let mut lcd = Hd44780::new(bus.clone(), MockDelay::new(), 0x27);
        let mut source = FixedSource::new(sample());
        let mut dashboard = DashboardScheduler::new();

        // fail part way through the render, recovery fails too
        bus.fail_after(10);
        assert!(!dashboard.tick(&mut lcd, &mut source, Duration::from_secs(3)).await);
        assert_eq!(dashboard.current_page(), Page::System);
        assert_eq!(dashboard.cycles(), 1);

        // bus comes back, rotation resumes from the same page
        bus.reset();
        assert!(dashboard.tick(&mut lcd, &mut source, Duration::from_secs(3)).await);
        assert_eq!(dashboard.current_page(), Page::Storage);
    }
}
