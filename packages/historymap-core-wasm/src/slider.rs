// Temporal slider: converts a drag position on the timeline track into a
// calendar date used to refilter time-bounded layers.
use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date {0:?} passed to the timeline, expected YYYY or YYYYMMDD")]
    Malformed(String),
}

/// Parse a compact date string. A bare year means January 1st of that year.
pub fn parse_compact(input: &str) -> Result<NaiveDate, DateError> {
    let malformed = || DateError::Malformed(input.to_string());
    let trimmed = input.trim();
    if !trimmed.is_ascii() {
        return Err(malformed());
    }
    let (year, month, day) = match trimmed.len() {
        4 => (trimmed.parse::<i32>().map_err(|_| malformed())?, 1, 1),
        8 => {
            let year = trimmed[0..4].parse::<i32>().map_err(|_| malformed())?;
            let month = trimmed[4..6].parse::<u32>().map_err(|_| malformed())?;
            let day = trimmed[6..8].parse::<u32>().map_err(|_| malformed())?;
            (year, month, day)
        }
        _ => return Err(malformed()),
    };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
}

/// Encode a date as an 8-digit YYYYMMDD integer.
pub fn to_compact(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Parse-and-encode in one step, for callers holding raw input.
pub fn date_from_compact(input: &str) -> Result<i32, DateError> {
    parse_compact(input).map(to_compact)
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Ordinal suffix for a day of month: 1st, 2nd, 3rd, 4th, 11th, 21st...
pub fn ordinal_suffix(day: u32) -> &'static str {
    match day % 100 {
        11 | 12 | 13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

/// Human-readable label for the date panel, e.g. "1st Jan 1625".
pub fn format_label(date: NaiveDate) -> String {
    let day = date.day();
    format!(
        "{}{} {} {}",
        day,
        ordinal_suffix(day),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { start_x: f64, grab_offset: f64 },
}

/// Slider state: fixed calendar bounds, a mutable pixel offset clamped to
/// the track width, and the drag phase.
#[derive(Debug, Clone)]
pub struct TimelineSlider {
    min_date: NaiveDate,
    max_date: NaiveDate,
    track_width: f64,
    offset: f64,
    drag: DragState,
}

impl TimelineSlider {
    pub fn new(min_date: &str, max_date: &str, track_width: f64) -> Result<Self, DateError> {
        let min = parse_compact(min_date)?;
        let max = parse_compact(max_date)?;
        Ok(TimelineSlider {
            min_date: min.min(max),
            max_date: max.max(min),
            track_width: track_width.max(0.0),
            offset: 0.0,
            drag: DragState::Idle,
        })
    }

    /// Whole days between the calendar bounds. `NaiveDate` has no timezone,
    /// so there is no daylight-saving skew to correct for.
    pub fn day_span(&self) -> i64 {
        self.max_date.signed_duration_since(self.min_date).num_days()
    }

    /// The date under the handle: min + round(offset / (width / span)) days.
    /// The same span feeds both this and the display label.
    pub fn selected_date(&self) -> NaiveDate {
        let span = self.day_span();
        if span <= 0 || self.track_width <= 0.0 {
            return self.min_date;
        }
        let day_width = self.track_width / span as f64;
        let days = (self.offset / day_width).round() as i64;
        self.min_date + Duration::days(days.clamp(0, span))
    }

    pub fn selected_compact(&self) -> i32 {
        to_compact(self.selected_date())
    }

    pub fn min_compact(&self) -> i32 {
        to_compact(self.min_date)
    }

    pub fn max_compact(&self) -> i32 {
        to_compact(self.max_date)
    }

    pub fn label(&self) -> String {
        format_label(self.selected_date())
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_track_width(&mut self, width: f64) {
        self.track_width = width.max(0.0);
        self.offset = self.offset.clamp(0.0, self.track_width);
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Pointer/touch down on the handle while idle.
    pub fn begin_drag(&mut self, x: f64) {
        if !self.is_dragging() {
            self.drag = DragState::Dragging {
                start_x: x,
                grab_offset: self.offset,
            };
        }
    }

    /// Pointer movement while dragging. Returns the newly selected compact
    /// date so the caller can refilter live; `None` while idle.
    pub fn drag_to(&mut self, x: f64) -> Option<i32> {
        let DragState::Dragging { start_x, grab_offset } = self.drag else {
            return None;
        };
        let dist = x - start_x;
        self.offset = (grab_offset + dist).clamp(0.0, self.track_width);
        Some(self.selected_compact())
    }

    /// Pointer/touch up or leave.
    pub fn end_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Year labels for the timeline: first tick one step past the minimum,
    /// then every second step doubled, five ticks in total.
    pub fn year_ticks(&self) -> Vec<i32> {
        let min = self.min_date.year() as f64;
        let max = self.max_date.year() as f64;
        let step = (max - min) / 10.0;
        let mut acc = min + step;
        let mut ticks = vec![acc.round() as i32];
        for i in 1..10 {
            if i % 2 == 0 {
                acc += step * 2.0;
                ticks.push(acc.round() as i32);
            }
        }
        ticks
    }
}

lazy_static! {
    static ref SLIDER: ReentrantMutex<RefCell<Option<TimelineSlider>>> =
        ReentrantMutex::new(RefCell::new(None));
}

pub fn install(slider: TimelineSlider) {
    let guard = SLIDER.lock();
    *guard.borrow_mut() = Some(slider);
}

/// Run `f` against the installed slider; `None` when no slider was set up.
pub fn with_installed<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut TimelineSlider) -> R,
{
    let guard = SLIDER.lock();
    let mut borrow = guard.borrow_mut();
    borrow.as_mut().map(f)
}
