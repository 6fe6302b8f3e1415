/// Format a build duration given in milliseconds, sub-second precision is dropped.
pub fn ms_to_human(duration: i64) -> String {
    if duration < 0 {
        return "-".to_string();
    }
    let duration = duration / 1000;

    let secs = duration % 60;
    let mins = duration / 60;
    let hours = mins / 60;
    let mins = mins % 60;

    let mut out = Vec::new();
    if hours > 0 {
        out.push(format!("{:2}h", hours));
    }
    if mins > 0 || hours > 0 {
        out.push(format!("{:2}m", mins));
    }
    out.push(format!("{:2}s", secs));

    out.join(" ")
}
