//! Leftmost-fit slot search inside candidate windows.

use chrono::Weekday;

use super::occupancy::Occupancy;
use crate::time::{ClockTime, TimeInterval};

/// Finds the earliest start on `day` where `minutes` fit in a free gap that
/// lies inside one of `windows`.
///
/// Every window is intersected with the day's free gaps; among all resulting
/// pieces long enough for `minutes`, the one starting first wins. Equal starts
/// go to the window declared first. Windows are day-bounded by construction,
/// so no extra clipping is needed. Pure query, never mutates.
pub fn find_slot(
    occupancy: &Occupancy,
    day: Weekday,
    minutes: u16,
    windows: &[TimeInterval],
) -> Option<ClockTime> {
    let gaps = occupancy.free_gaps(day);
    let mut best: Option<ClockTime> = None;

    for window in windows {
        // Gaps are sorted, so the first piece that fits is this window's earliest.
        let earliest = gaps
            .iter()
            .filter_map(|gap| window.intersect(gap))
            .find(|piece| piece.can_fit(minutes))
            .map(|piece| piece.start());

        if let Some(start) = earliest {
            if best.map_or(true, |current| start < current) {
                best = Some(start);
            }
        }
    }

    best
}
