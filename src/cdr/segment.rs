//! Day segmentation: split a time window into one segment per calendar day.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::extract::TimeWindow;

/// A time window clipped to one calendar day, numbered from 1 within its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub sequence: u32,
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last millisecond of `date` (23:59:59.999).
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

/// Whole calendar days from the date of `window.begin` to the date of `window.end`.
pub fn days_between(window: &TimeWindow) -> i64 {
    (window.end.date() - window.begin.date()).num_days()
}

/// Day span above which a window most likely comes from a corrupt timestamp.
pub const LONG_WINDOW_DAYS: i64 = 31;

/// True when `window` spans more than `LONG_WINDOW_DAYS` calendar days.
pub fn is_long_window(window: &TimeWindow) -> bool {
    days_between(window) > LONG_WINDOW_DAYS
}

/// Split `window` into consecutive per-day segments.
///
/// The first segment starts at `window.begin`, the last ends at `window.end`,
/// and every boundary in between runs from 00:00:00.000 to 23:59:59.999.
pub fn segment(window: &TimeWindow) -> Vec<Segment> {
    let days = days_between(window);
    if days == 0 {
        return vec![Segment {
            sequence: 1,
            begin: window.begin,
            end: window.end,
        }];
    }

    let mut segments = Vec::with_capacity(days as usize + 1);
    let mut date = window.begin.date();
    for offset in 0..=days {
        let begin = if offset == 0 { window.begin } else { start_of_day(date) };
        let end = if offset == days {
            window.end
        } else {
            end_of_day(date).max(begin)
        };
        segments.push(Segment {
            sequence: offset as u32 + 1,
            begin,
            end,
        });

        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn at_ms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_milli_opt(h, mi, s, ms)
            .unwrap()
    }

    fn assert_partition(window: &TimeWindow, segments: &[Segment]) {
        assert_eq!(segments.first().unwrap().begin, window.begin);
        assert_eq!(segments.last().unwrap().end, window.end);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.sequence as usize, i + 1);
            assert!(seg.begin <= seg.end);
            assert_eq!(seg.begin.date(), seg.end.date());
        }
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end + Duration::milliseconds(1), pair[1].begin);
            assert_eq!(pair[0].end.date().succ_opt().unwrap(), pair[1].begin.date());
        }
    }

    #[test]
    fn test_same_day_single_segment() {
        let window = TimeWindow::new(at(2022, 1, 17, 0, 0, 0), at(2022, 1, 17, 23, 59, 59));
        let segments = segment(&window);
        assert_eq!(
            segments,
            vec![Segment {
                sequence: 1,
                begin: window.begin,
                end: window.end
            }]
        );
    }

    #[test]
    fn test_single_instant() {
        let window = TimeWindow::at(at(2022, 1, 17, 12, 0, 0));
        let segments = segment(&window);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].begin, segments[0].end);
    }

    #[test]
    fn test_midnight_rollover_two_segments() {
        let window = TimeWindow::new(at(2022, 1, 17, 23, 59, 59), at(2022, 1, 18, 0, 5, 0));
        let segments = segment(&window);
        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0],
            Segment {
                sequence: 1,
                begin: at(2022, 1, 17, 23, 59, 59),
                end: at_ms(2022, 1, 17, 23, 59, 59, 999),
            }
        );
        assert_eq!(
            segments[1],
            Segment {
                sequence: 2,
                begin: at(2022, 1, 18, 0, 0, 0),
                end: at(2022, 1, 18, 0, 5, 0),
            }
        );
        assert_partition(&window, &segments);
    }

    #[test]
    fn test_end_exactly_at_midnight() {
        let window = TimeWindow::new(at(2022, 1, 17, 22, 0, 0), at(2022, 1, 18, 0, 0, 0));
        let segments = segment(&window);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].begin, segments[1].end);
        assert_partition(&window, &segments);
    }

    #[test]
    fn test_multi_day_partition() {
        let window = TimeWindow::new(at(2022, 2, 26, 13, 30, 0), at(2022, 3, 2, 6, 15, 0));
        let segments = segment(&window);
        // 26, 27, 28 Feb, 1, 2 Mar
        assert_eq!(segments.len(), 5);
        assert_eq!(days_between(&window), 4);
        assert_partition(&window, &segments);
        assert_eq!(segments[2].begin, at(2022, 2, 28, 0, 0, 0));
        assert_eq!(segments[2].end, at_ms(2022, 2, 28, 23, 59, 59, 999));
    }

    #[test]
    fn test_segment_count_matches_days_touched() {
        let begin = at(2021, 12, 30, 18, 0, 0);
        for extra_days in 0..10i64 {
            let end = begin + Duration::days(extra_days) + Duration::hours(3);
            let window = TimeWindow::new(begin, end);
            let segments = segment(&window);
            assert_eq!(segments.len() as i64, days_between(&window) + 1);
            assert_partition(&window, &segments);
        }
    }

    #[test]
    fn test_long_window_threshold() {
        let rollover = TimeWindow::new(at(2022, 1, 17, 23, 55, 0), at(2022, 1, 18, 0, 5, 0));
        assert!(!is_long_window(&rollover));

        let month = TimeWindow::new(at(2022, 1, 1, 0, 0, 0), at(2022, 2, 1, 23, 0, 0));
        assert_eq!(days_between(&month), 31);
        assert!(!is_long_window(&month));

        // A stray year-1 timestamp in a 2022 file
        let corrupt = TimeWindow::new(at(1, 1, 1, 0, 0, 0), at(2022, 1, 17, 16, 25, 0));
        assert!(is_long_window(&corrupt));
    }

    #[test]
    fn test_end_of_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(end_of_day(date), at_ms(2024, 2, 29, 23, 59, 59, 999));
        assert_eq!(start_of_day(date), at(2024, 2, 29, 0, 0, 0));
    }
}
