use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::BookingError;
use crate::limits::MAX_SERVICE_DATES;
use crate::model::*;

use super::error::Refusal;

/// Result of confirming a multi-date pick. Zero dates means the caller
/// should drop the service; the selector itself does not treat it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSelection {
    pub booking_code: BookingCode,
    pub dates: Vec<NaiveDate>,
}

impl ServiceSelection {
    /// `Ok(None)` when nothing was selected. Too many dates is an error,
    /// never an empty selection.
    pub fn into_dates(self) -> Result<Option<ServiceDates>, BookingError> {
        if self.dates.is_empty() {
            return Ok(None);
        }
        ServiceDates::new(self.dates).map(Some)
    }
}

/// Unordered set of usage dates for an add-on service, each checked
/// against the validity window of the bound booking.
#[derive(Debug, Clone)]
pub struct MultiDateSelector {
    binding: Option<(BookingCode, ValidityWindow)>,
    today: NaiveDate,
    selected: BTreeSet<NaiveDate>,
}

impl MultiDateSelector {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            binding: None,
            today,
            selected: BTreeSet::new(),
        }
    }

    /// Bind to a resolved booking. Any change of code or window drops the
    /// current selection instead of re-checking it.
    pub fn bind(&mut self, code: BookingCode, window: ValidityWindow) {
        let unchanged = matches!(&self.binding, Some((c, w)) if *c == code && *w == window);
        if !unchanged {
            self.selected.clear();
        }
        self.binding = Some((code, window));
    }

    /// The booking code field changed and is no longer resolved.
    pub fn unbind(&mut self) {
        self.binding = None;
        self.selected.clear();
    }

    pub fn booking_code(&self) -> Option<&BookingCode> {
        self.binding.as_ref().map(|(c, _)| c)
    }

    pub fn window(&self) -> Option<ValidityWindow> {
        self.binding.as_ref().map(|(_, w)| *w)
    }

    pub fn is_selectable(&self, day: NaiveDate) -> bool {
        self.window()
            .is_some_and(|w| w.is_selectable(day, self.today))
    }

    /// Flip membership of `day`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, day: NaiveDate) -> Result<bool, Refusal> {
        let result = self.flip(day);
        if let Err(refusal) = &result {
            metrics::counter!(crate::observability::SELECTION_REFUSALS_TOTAL, "reason" => refusal.label())
                .increment(1);
        }
        result
    }

    fn flip(&mut self, day: NaiveDate) -> Result<bool, Refusal> {
        let Some((_, window)) = &self.binding else {
            return Err(Refusal::NoWindow);
        };
        if day < self.today {
            return Err(Refusal::Past(day));
        }
        if !window.contains(day) {
            return Err(Refusal::OutsideWindow(day));
        }
        if self.selected.remove(&day) {
            return Ok(false);
        }
        if self.selected.len() >= MAX_SERVICE_DATES {
            return Err(Refusal::TooManyDates(MAX_SERVICE_DATES));
        }
        self.selected.insert(day);
        Ok(true)
    }

    /// Selected dates in ascending order.
    pub fn selected(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn confirm(&self) -> Result<ServiceSelection, BookingError> {
        let (code, _) = self
            .binding
            .as_ref()
            .ok_or_else(|| BookingError::Validation("booking code not yet resolved".into()))?;
        Ok(ServiceSelection {
            booking_code: code.clone(),
            dates: self.selected().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn code(s: &str) -> BookingCode {
        BookingCode::canonicalize(s, "FS-").unwrap()
    }

    fn bound() -> MultiDateSelector {
        let mut s = MultiDateSelector::new(day(6, 20));
        s.bind(code("ABC123"), ValidityWindow::new(day(7, 1), day(7, 5)).unwrap());
        s
    }

    #[test]
    fn unbound_selector_refuses() {
        let mut s = MultiDateSelector::new(day(6, 20));
        assert_eq!(s.toggle(day(7, 2)), Err(Refusal::NoWindow));
        assert!(s.confirm().is_err());
    }

    #[test]
    fn toggles_inside_window_any_order() {
        let mut s = bound();
        assert_eq!(s.toggle(day(7, 4)), Ok(true));
        assert_eq!(s.toggle(day(7, 2)), Ok(true));
        assert_eq!(s.selected().collect::<Vec<_>>(), vec![day(7, 2), day(7, 4)]);
        assert_eq!(s.toggle(day(7, 5)), Ok(true)); // end is inclusive
    }

    #[test]
    fn outside_window_refused() {
        let mut s = bound();
        assert_eq!(s.toggle(day(6, 30)), Err(Refusal::OutsideWindow(day(6, 30))));
        assert_eq!(s.toggle(day(7, 6)), Err(Refusal::OutsideWindow(day(7, 6))));
        assert!(s.is_empty());
    }

    #[test]
    fn past_day_refused_even_inside_window() {
        let mut s = MultiDateSelector::new(day(7, 3));
        s.bind(code("ABC123"), ValidityWindow::new(day(7, 1), day(7, 5)).unwrap());
        assert_eq!(s.toggle(day(7, 2)), Err(Refusal::Past(day(7, 2))));
        assert!(!s.is_selectable(day(7, 2)));
        assert!(s.is_selectable(day(7, 3)));
    }

    #[test]
    fn double_toggle_is_identity() {
        let mut s = bound();
        s.toggle(day(7, 3)).unwrap();
        let before: Vec<_> = s.selected().collect();
        s.toggle(day(7, 2)).unwrap();
        s.toggle(day(7, 2)).unwrap();
        assert_eq!(s.selected().collect::<Vec<_>>(), before);
    }

    #[test]
    fn rebinding_other_code_resets_selection() {
        let mut s = bound();
        s.toggle(day(7, 2)).unwrap();
        s.bind(code("ABC123"), ValidityWindow::new(day(7, 1), day(7, 5)).unwrap());
        assert_eq!(s.len(), 1); // same binding, kept

        s.bind(code("XYZ9"), ValidityWindow::new(day(7, 1), day(7, 5)).unwrap());
        assert!(s.is_empty());
        assert_eq!(s.booking_code(), Some(&code("XYZ9")));
    }

    #[test]
    fn unbind_clears() {
        let mut s = bound();
        s.toggle(day(7, 2)).unwrap();
        s.unbind();
        assert!(s.is_empty());
        assert!(s.window().is_none());
    }

    #[test]
    fn confirm_with_no_dates_reports_zero() {
        let s = bound();
        let selection = s.confirm().unwrap();
        assert!(selection.dates.is_empty());
        assert_eq!(selection.into_dates(), Ok(None));
    }

    #[test]
    fn confirm_carries_canonical_code() {
        let mut s = bound();
        s.toggle(day(7, 2)).unwrap();
        let selection = s.confirm().unwrap();
        assert_eq!(selection.booking_code.as_str(), "FS-ABC123");
        assert_eq!(selection.into_dates().unwrap().unwrap().len(), 1);
    }

    fn long_window() -> MultiDateSelector {
        let start = day(7, 1);
        let mut s = MultiDateSelector::new(day(6, 20));
        s.bind(code("LONG1"), ValidityWindow::new(start, start + chrono::Days::new(89)).unwrap());
        s
    }

    #[test]
    fn date_count_capped_at_click_time() {
        let mut s = long_window();
        for i in 0..MAX_SERVICE_DATES as u64 {
            assert_eq!(s.toggle(day(7, 1) + chrono::Days::new(i)), Ok(true));
        }
        assert_eq!(s.len(), MAX_SERVICE_DATES);

        let extra = day(7, 1) + chrono::Days::new(MAX_SERVICE_DATES as u64);
        assert_eq!(s.toggle(extra), Err(Refusal::TooManyDates(MAX_SERVICE_DATES)));
        assert_eq!(s.len(), MAX_SERVICE_DATES);

        // Deselecting still works at the cap, and frees a slot.
        assert_eq!(s.toggle(day(7, 1)), Ok(false));
        assert_eq!(s.toggle(extra), Ok(true));

        let dates = s.confirm().unwrap().into_dates().unwrap().unwrap();
        assert_eq!(dates.len(), MAX_SERVICE_DATES);
    }

    #[test]
    fn oversized_selection_is_an_error_not_empty() {
        let selection = ServiceSelection {
            booking_code: code("LONG1"),
            dates: (0..=MAX_SERVICE_DATES as u64)
                .map(|i| day(7, 1) + chrono::Days::new(i))
                .collect(),
        };
        assert!(matches!(selection.into_dates(), Err(BookingError::LimitExceeded(_))));
    }
}
