//! Advanced-lift classification
//!
//! A lift is advanced when it has a long history whose top-set e1RM barely
//! moves. For such lifts small deviations are meaningful, so the detector
//! switches to the tighter preset.

use crate::models::TopSet;
use crate::stats;

/// Sessions below which a lift is always a novice lift
pub const NOVICE_SESSIONS: usize = 6;

/// Whether one exercise's history qualifies as advanced
///
/// Requires at least `min_sessions` rows and a top e1RM coefficient of
/// variation (sample std / mean) below `cv_threshold`.
pub fn classify_advanced(rows: &[TopSet], min_sessions: usize, cv_threshold: f64) -> bool {
    if rows.len() < NOVICE_SESSIONS || rows.len() < min_sessions {
        return false;
    }
    let e1rms: Vec<f64> = rows.iter().map(|r| r.e1rm).collect();
    stats::coefficient_of_variation(&e1rms).map_or(false, |cv| cv < cv_threshold)
}
