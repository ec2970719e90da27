//! Timeline recorder for the Gantt view
//!
//! Intervals are append-only and kept in execution order. Colors are handed
//! out per VM in first-seen order and wrap around the palette.

use std::collections::HashMap;

use vmra_core::VmId;

use crate::types::{SimTime, TaskInterval};

/// Append-only record of executed task-units
#[derive(Debug, Clone)]
pub struct TimelineRecorder {
    intervals: Vec<TaskInterval>,
    palette: Vec<String>,
    colors: HashMap<VmId, usize>,
    // Order in which VMs were first seen, for the legend
    legend: Vec<VmId>,
}

impl TimelineRecorder {
    /// Create an empty recorder. `palette` must not be empty.
    pub fn new(palette: Vec<String>) -> Self {
        TimelineRecorder {
            intervals: Vec::new(),
            palette,
            colors: HashMap::new(),
            legend: Vec::new(),
        }
    }

    /// Color key for a VM, assigning the next palette entry on first sight
    pub fn color_key(&mut self, vm_id: VmId) -> String {
        let index = match self.colors.get(&vm_id) {
            Some(&index) => index,
            None => {
                let index = self.colors.len();
                self.colors.insert(vm_id, index);
                self.legend.push(vm_id);
                index
            }
        };
        self.palette[index % self.palette.len()].clone()
    }

    /// Color already assigned to a VM, if any
    pub fn color_of(&self, vm_id: VmId) -> Option<&str> {
        self.colors
            .get(&vm_id)
            .map(|&index| self.palette[index % self.palette.len()].as_str())
    }

    pub fn record(&mut self, interval: TaskInterval) {
        self.intervals.push(interval);
    }

    pub fn intervals(&self) -> &[TaskInterval] {
        &self.intervals
    }

    /// Intervals of a single VM, in execution order
    pub fn intervals_for(&self, vm_id: VmId) -> impl Iterator<Item = &TaskInterval> + Clone + '_ {
        self.intervals.iter().filter(move |interval| interval.vm_id == vm_id)
    }

    /// VMs in first-seen order
    pub fn legend(&self) -> &[VmId] {
        &self.legend
    }

    /// Earliest start and latest end over the whole timeline
    pub fn span(&self) -> Option<(SimTime, SimTime)> {
        let start = self.intervals.iter().map(|i| i.start_time).min()?;
        let end = self.intervals.iter().map(|i| i.end_time).max()?;
        Some((start, end))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
        self.colors.clear();
        self.legend.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(recorder: &mut TimelineRecorder, vm_id: VmId, sequence: u32, start: SimTime) -> TaskInterval {
        TaskInterval {
            vm_id,
            sequence,
            start_time: start,
            end_time: start + 1,
            color_key: recorder.color_key(vm_id),
        }
    }

    #[test]
    fn test_first_seen_color_assignment() {
        let mut recorder = TimelineRecorder::new(vec!["red".into(), "green".into()]);

        assert_eq!(recorder.color_key(7), "red");
        assert_eq!(recorder.color_key(3), "green");
        assert_eq!(recorder.color_key(7), "red");
        assert_eq!(recorder.legend(), &[7, 3]);
    }

    #[test]
    fn test_palette_wraps() {
        let mut recorder = TimelineRecorder::new(vec!["red".into(), "green".into()]);
        recorder.color_key(1);
        recorder.color_key(2);

        assert_eq!(recorder.color_key(3), "red");
        assert_eq!(recorder.color_of(3), Some("red"));
        assert_eq!(recorder.color_of(4), None);
    }

    #[test]
    fn test_intervals_for_is_restartable() {
        let mut recorder = TimelineRecorder::new(vec!["red".into()]);
        for (t, vm) in [1, 2, 1, 2, 1].into_iter().enumerate() {
            let i = interval(&mut recorder, vm, t as u32 / 2 + 1, t as u64);
            recorder.record(i);
        }

        let row = recorder.intervals_for(1);
        let starts: Vec<SimTime> = row.clone().map(|i| i.start_time).collect();
        assert_eq!(starts, vec![0, 2, 4]);
        // Second pass over the same row
        assert_eq!(row.count(), 3);
        assert_eq!(recorder.intervals_for(9).count(), 0);
    }

    #[test]
    fn test_span_and_clear() {
        let mut recorder = TimelineRecorder::new(vec!["red".into()]);
        assert_eq!(recorder.span(), None);

        let a = interval(&mut recorder, 1, 1, 3);
        let b = interval(&mut recorder, 2, 1, 4);
        recorder.record(a);
        recorder.record(b);
        assert_eq!(recorder.span(), Some((3, 5)));

        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.legend().is_empty());
        assert_eq!(recorder.color_of(1), None);
    }
}
