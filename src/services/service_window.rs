//! Daily service window gate with overnight wraparound.

use chrono::NaiveTime;
use thiserror::Error;

use crate::entities::service_settings;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceWindowError {
    #[error("service window start equals end ({0}); the window must be a real interval")]
    EmptyWindow(NaiveTime),
}

/// Daily window `[start, end]`, both bounds included. When `start > end`
/// the window wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl ServiceWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<ServiceWindow, ServiceWindowError> {
        if start == end {
            return Err(ServiceWindowError::EmptyWindow(start));
        }
        Ok(ServiceWindow { start, end })
    }

    pub fn from_settings(
        settings: &service_settings::Model,
    ) -> Result<ServiceWindow, ServiceWindowError> {
        ServiceWindow::new(settings.work_start_time, settings.work_end_time)
    }

    pub fn contains(&self, at: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= at && at <= self.end
        } else {
            at >= self.start || at <= self.end
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn same_day_window_includes_both_bounds() {
        let window = ServiceWindow::new(at(10, 0), at(22, 0)).unwrap();
        assert!(window.contains(at(10, 0)));
        assert!(window.contains(at(15, 30)));
        assert!(window.contains(at(22, 0)));
        assert!(!window.contains(at(22, 1)));
        assert!(!window.contains(at(9, 59)));
        assert!(!window.contains(at(23, 0)));
    }

    #[test]
    fn overnight_window_wraps_past_midnight() {
        let window = ServiceWindow::new(at(22, 0), at(6, 0)).unwrap();
        assert!(window.contains(at(22, 0)));
        assert!(window.contains(at(23, 45)));
        assert!(window.contains(at(0, 0)));
        assert!(window.contains(at(5, 59)));
        assert!(window.contains(at(6, 0)));
        assert!(!window.contains(at(6, 1)));
        assert!(!window.contains(at(12, 0)));
        assert!(!window.contains(at(21, 59)));
    }

    #[test]
    fn equal_start_and_end_is_a_configuration_error() {
        assert_eq!(
            ServiceWindow::new(at(10, 0), at(10, 0)),
            Err(ServiceWindowError::EmptyWindow(at(10, 0)))
        );
    }
}
