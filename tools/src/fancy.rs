use colored::Colorize;
use nodelog::jobs::TrackOutcome;
use nodelog_common::Build;

pub trait Fancy {
    fn fancy(&self) -> String;
}

impl Fancy for TrackOutcome {
    fn fancy(&self) -> String {
        match self {
            TrackOutcome::Added => self.to_string().green().to_string(),
            TrackOutcome::AlreadyTracked => self.to_string().yellow().to_string(),
            TrackOutcome::NotFound | TrackOutcome::Failed(_) => self.to_string().red().to_string(),
        }
    }
}

/// Highlights the host column, placeholders are shown in red.
pub struct Host<'a>(pub &'a Build);

impl Fancy for Host<'_> {
    fn fancy(&self) -> String {
        if self.0.has_host() {
            self.0.host.bold().to_string()
        } else {
            self.0.host.red().to_string()
        }
    }
}
