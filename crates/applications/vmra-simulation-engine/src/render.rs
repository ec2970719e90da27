//! Plain-text rendering for the CLI

use std::fmt::Write;

use vmra_core::{FleetSummary, Prediction, VmSnapshot};

use crate::timeline::TimelineRecorder;

/// Width of the Gantt bar area, in characters
pub const GANTT_WIDTH: usize = 50;

pub fn summary(summary: &FleetSummary) -> String {
    format!(
        "Summary:\n  Total CPU Usage: {}\n  Total Memory Usage: {}\n  VM Count: {}\n",
        summary.total_cpu_usage, summary.total_memory_usage, summary.vm_count
    )
}

pub fn vm_table(vms: &[VmSnapshot]) -> String {
    if vms.is_empty() {
        return "No VMs available. Please add VMs to start scheduling.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<8} {:>10} {:>14} {:<10} {:>10}",
        "ID", "Name", "CPU Usage", "Memory Usage", "Status", "Remaining"
    );
    let _ = writeln!(out, "{}", "-".repeat(61));
    for vm in vms {
        let _ = writeln!(
            out,
            "{:<4} {:<8} {:>10} {:>14} {:<10} {:>10}",
            vm.id, vm.name, vm.cpu_usage, vm.memory_usage, vm.status, vm.remaining_task_units
        );
    }
    out
}

pub fn predictions(predictions: &[Prediction]) -> String {
    if predictions.is_empty() {
        return "No predictions available.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:>14} {:>17}", "VM", "Predicted CPU", "Predicted Memory");
    for p in predictions {
        let _ = writeln!(
            out,
            "{:<6} {:>14.2} {:>17.2}",
            p.vm_id, p.predicted_cpu, p.predicted_memory
        );
    }
    out
}

/// Text Gantt chart: a legend, then one row per interval with its bar
/// placed proportionally within the timeline span
pub fn gantt(timeline: &TimelineRecorder, width: usize) -> String {
    let Some((start, end)) = timeline.span() else {
        return "No tasks recorded.\n".to_string();
    };
    let total = (end - start).max(1) as f64;
    let width = width.max(1);

    let mut out = String::new();
    let legend: Vec<String> = timeline
        .legend()
        .iter()
        .map(|&vm_id| format!("VM {} {}", vm_id, timeline.color_of(vm_id).unwrap_or("-")))
        .collect();
    let _ = writeln!(out, "Legend: {}", legend.join(", "));

    for interval in timeline.intervals() {
        let left = ((interval.start_time - start) as f64 / total * width as f64).round() as usize;
        let len = ((interval.duration() as f64 / total * width as f64).round() as usize).max(1);
        let left = left.min(width - 1);
        let len = len.min(width - left);

        let label = format!("{} (VM{})", interval.label(), interval.vm_id);
        let _ = writeln!(
            out,
            "{:<16} |{}{}{}| {}-{}",
            label,
            " ".repeat(left),
            "#".repeat(len),
            " ".repeat(width - left - len),
            interval.start_time,
            interval.end_time
        );
    }
    out
}
