/// Screen-view tracking. Views are emitted as `usage` tracing events and
/// remembered for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Usage {
    screen_views: Vec<String>,
}

impl Usage {
    pub fn track_screen_view(&mut self, screen: &str) {
        tracing::info!(target: "usage", screen, "screen view");
        self.screen_views.push(screen.to_string());
    }

    pub fn screen_views(&self) -> &[String] {
        &self.screen_views
    }
}
