use crate::output::print_json;
use gotham_core::milestone;

pub fn run(previous: u64, current: u64, json: bool) -> anyhow::Result<()> {
    let hit = milestone::detect(previous, current);

    if json {
        return print_json(&serde_json::json!({
            "previous": previous,
            "current": current,
            "milestone": hit,
        }));
    }

    match hit {
        Some(m) => println!(
            "Milestone reached: {} subscribers (celebrates like a {:.2} payment)",
            m.threshold, m.celebration_amount
        ),
        None => println!("No milestone between {previous} and {current}."),
    }
    Ok(())
}
