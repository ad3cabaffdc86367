use std::fmt::Write;

use crate::additives::CompoundSelection;
use crate::config::ControllerConfig;
use crate::reconcile::AdditiveMap;
use crate::session::ExperimentRecord;

pub fn format_selections(selections: &[CompoundSelection]) -> String {
    let mut out = String::new();
    if selections.is_empty() {
        out.push_str("  (none)\n");
    }
    for s in selections {
        let _ = writeln!(out, "  - {}", s);
    }
    out
}

/// Used slots only, one per line.
pub fn format_additives(additives: &AdditiveMap) -> String {
    let mut out = String::new();
    for slot in additives.used() {
        let _ = writeln!(
            out,
            "  {}: port={}, used={}, percentage={:.2}, volume={:.2} ml",
            slot.id, slot.port, slot.used, slot.percentage, slot.volume
        );
    }
    out
}

/// Console summary of a single run.
pub fn format_experiment(record: &ExperimentRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Running Experiment #{} ({} Mode) ===", record.sequence, record.mode);
    let _ = writeln!(out, "Number of Iterations: {}", record.iterations);
    out.push_str("Compounds selected:\n");
    out.push_str(&format_selections(&record.selections));
    let _ = writeln!(out, "Total Additive Concentration (overall): {:.2}%", record.declared_total);
    if let Some(mean) = record.mean_conductivity() {
        let _ = writeln!(out, "Mean conductivity over {} readings: {:.2}", record.readings.len(), mean);
    }
    for advisory in &record.advisories {
        let _ = writeln!(out, "Overridden: {}", advisory.title());
    }
    out.push_str("[Controller] Final additives after integration:\n");
    out.push_str(&format_additives(&record.additives));
    for u in &record.unrecognized {
        let _ = writeln!(out, "  ! {} ({:.2}%) has no slot and was not dispensed", u.key, u.percentage);
    }
    out
}

pub fn format_log(log: &[ExperimentRecord]) -> String {
    let mut out = String::from("[Experiments Log] So far:\n");
    for record in log {
        let _ = writeln!(
            out,
            "  Experiment #{} ({}) -> Iterations: {}",
            record.sequence, record.mode, record.iterations
        );
        let compounds = record
            .selections
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "    Compounds: [{}]", compounds);
        out.push_str("    Additives used:\n");
        for slot in record.additives.used() {
            let _ = writeln!(out, "      {}: {:.2}% / {:.2} ml", slot.id, slot.percentage, slot.volume);
        }
    }
    out.push_str("=== End of this experiment's summary ===\n");
    out
}

/// Current compound list and controller constants.
pub fn format_parameters(selections: &[CompoundSelection], config: &ControllerConfig) -> String {
    let mut out = String::from("Experiment Parameters:\n");
    out.push_str(&format_selections(selections));
    let _ = writeln!(out, "Pump port: {} @ {} baud", config.pump_port, config.baud_rate);
    let _ = writeln!(out, "Meter port: {}", config.meter_port);
    let _ = writeln!(out, "Total volume: {:.2} ml", config.total_volume_ml);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;

    #[test]
    fn additive_lines_use_two_decimals() {
        let selections = vec![CompoundSelection::new("Compound 1", 6.0).unwrap()];
        let result = reconcile(&selections, 10.0, 3.0);
        let text = format_additives(&result.additives);
        assert_eq!(
            text,
            "  TEP: port=2, used=true, percentage=6.00, volume=0.18 ml\n  \
             LP30: port=1, used=true, percentage=90.00, volume=2.70 ml\n"
        );
    }

    #[test]
    fn empty_selection_list_says_none() {
        assert_eq!(format_selections(&[]), "  (none)\n");
    }
}
