//! Sliding window state — app-owned, crate-provided update logic.

use std::collections::VecDeque;

use serde::Serialize;

use super::Sample;
use crate::error::StreamError;
use crate::shared::fmt::num::display_money;
use crate::shared::LabelFormat;

/// Window size used when none is configured.
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

/// Chart-ready copy of the window, oldest → newest.
///
/// `labels[i]` and `values[i]` always come from the same sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SeriesSnapshot {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl SeriesSnapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(label, value)` pairs in chart order.
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Values formatted as money for tooltips, index-aligned with `values`.
    pub fn display_values(&self) -> Vec<String> {
        self.values.iter().map(|v| display_money(*v)).collect()
    }
}

/// Bounded FIFO of the most recent samples.
///
/// Capacity is fixed at construction. `push` is the only mutation: it appends
/// at the tail and, once full, evicts from the head.
#[derive(Debug, Clone)]
pub struct SeriesWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
    label_format: LabelFormat,
}

impl SeriesWindow {
    pub fn new(capacity: usize, label_format: LabelFormat) -> Result<Self, StreamError> {
        if capacity == 0 {
            return Err(StreamError::Validation(
                "window capacity must be at least 1".to_string(),
            ));
        }
        label_format.validate().map_err(StreamError::Validation)?;

        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            label_format,
        })
    }

    /// Append a sample, evicting the oldest if at capacity.
    ///
    /// Returns the evicted sample, if any.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        assert!(
            self.samples.len() <= self.capacity,
            "series window holds {} samples but capacity is {}",
            self.samples.len(),
            self.capacity
        );

        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);

        if let Some(old) = &evicted {
            tracing::debug!(
                evicted_at = %old.timestamp(),
                len = self.samples.len(),
                "window full, evicted oldest sample"
            );
        }
        evicted
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        let (labels, values) = self
            .samples
            .iter()
            .map(|s| (self.label_format.format(&s.timestamp()), s.value()))
            .unzip();
        SeriesSnapshot { labels, values }
    }

    /// Samples oldest → newest.
    pub fn samples(&self) -> impl ExactSizeIterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn label_format(&self) -> &LabelFormat {
        &self.label_format
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const T0: i64 = 1_709_294_400; // 2024-03-01T12:00:00Z

    fn sample(offset_secs: i64, value: f64) -> Sample {
        Sample::new(Utc.timestamp_opt(T0 + offset_secs, 0).unwrap(), value)
    }

    fn window(capacity: usize) -> SeriesWindow {
        SeriesWindow::new(capacity, LabelFormat::utc("%H:%M:%S")).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = SeriesWindow::new(0, LabelFormat::default());
        assert!(matches!(result, Err(StreamError::Validation(_))));
    }

    #[test]
    fn test_invalid_label_pattern_rejected() {
        let result = SeriesWindow::new(5, LabelFormat::utc("%Q"));
        assert!(matches!(result, Err(StreamError::Validation(_))));
    }

    #[test]
    fn test_push_grows_without_padding() {
        let mut w = window(5);
        w.push(sample(0, 1.0));
        w.push(sample(1, 2.0));
        assert_eq!(w.len(), 2);
        assert!(!w.is_full());
        let snap = w.snapshot();
        assert_eq!(snap.values, vec![1.0, 2.0]);
        assert_eq!(snap.labels, vec!["12:00:00", "12:00:01"]);
    }

    #[test]
    fn test_capacity_three_keeps_last_three() {
        let mut w = window(3);
        for (i, v) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            w.push(sample(i as i64, v));
        }
        assert_eq!(w.snapshot().values, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_fifo_eviction_drops_first_pushed() {
        let n = 4;
        let mut w = window(n);
        let pushed: Vec<Sample> = (0..=n as i64).map(|i| sample(i, i as f64)).collect();
        let mut evicted = Vec::new();
        for s in &pushed {
            evicted.extend(w.push(*s));
        }
        assert_eq!(evicted, vec![pushed[0]]);
        let kept: Vec<Sample> = w.samples().copied().collect();
        assert_eq!(kept, pushed[1..].to_vec());
        assert_eq!(w.oldest(), Some(&pushed[1]));
        assert_eq!(w.latest(), Some(&pushed[n]));
    }

    #[test]
    fn test_bounded_and_aligned_after_every_push() {
        let mut w = window(7);
        for i in 0..50 {
            w.push(sample(i, (i * 3 % 11) as f64));
            assert!(w.len() <= w.capacity());
            let snap = w.snapshot();
            assert_eq!(snap.labels.len(), snap.values.len());
            assert_eq!(snap.len(), w.len());
            for ((label, value), s) in snap.points().zip(w.samples()) {
                assert_eq!(label, s.timestamp().format("%H:%M:%S").to_string());
                assert_eq!(value, s.value());
            }
        }
    }

    #[test]
    fn test_arrival_order_not_timestamp_order() {
        let mut w = window(3);
        w.push(sample(10, 1.0));
        w.push(sample(5, 2.0));
        w.push(sample(20, 3.0));
        let snap = w.snapshot();
        assert_eq!(snap.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(snap.labels, vec!["12:00:10", "12:00:05", "12:00:20"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut w = window(3);
        w.push(sample(0, 1.0));
        let mut snap = w.snapshot();
        snap.values[0] = 999.0;
        snap.labels.clear();
        assert_eq!(w.snapshot().values, vec![1.0]);
        assert_eq!(w.snapshot().labels.len(), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let w = window(3);
        let snap = w.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap, SeriesSnapshot::default());
        assert!(w.latest().is_none());
    }

    #[test]
    fn test_display_values() {
        let mut w = window(2);
        w.push(sample(0, 101234.5));
        w.push(sample(1, 99999.999));
        assert_eq!(w.snapshot().display_values(), vec!["101,234.50", "100,000.00"]);
    }
}
