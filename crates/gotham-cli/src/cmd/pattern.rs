use crate::output::{print_json, print_table};
use gotham_core::pattern::{self, Tier};

pub fn run(amount: f64, json: bool) -> anyhow::Result<()> {
    let tier = Tier::for_amount(amount);
    let pattern = pattern::for_amount(amount);

    if json {
        return print_json(&serde_json::json!({
            "amount": amount,
            "tier": tier.name(),
            "pattern": pattern,
        }));
    }

    println!(
        "{} pattern for {amount:.2}: {} steps per {:.1}s cycle, {:.0}s total",
        pattern.name,
        pattern.steps.len(),
        pattern.cycle_duration().as_secs_f64(),
        pattern.total_duration.as_secs_f64(),
    );
    let rows: Vec<Vec<String>> = pattern
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            vec![
                (i + 1).to_string(),
                step.color.to_string(),
                if step.is_off() {
                    "off".to_string()
                } else {
                    step.brightness.to_string()
                },
                format!("{:.1}s", step.hold.as_secs_f64()),
            ]
        })
        .collect();
    print_table(&["#", "COLOR", "BRIGHTNESS", "HOLD"], &rows);
    Ok(())
}
