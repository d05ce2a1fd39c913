//! Engine tunables with environment overrides.

#[derive(Debug, Clone)]
pub struct Settings {
    /// Page size for the conversation snapshot fetch.
    pub thread_page_size: u32,
    /// Page size for initial and backward timeline fetches.
    pub message_page_size: u32,
    /// Scroll distance from the top, in pixels, below which a backward
    /// page is requested.
    pub near_top_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thread_page_size: 20,
            message_page_size: 30,
            near_top_threshold: 50.0,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Some(v) = env_u32("APP__THREAD_PAGE_SIZE") {
        settings.thread_page_size = v;
    }
    if let Some(v) = env_u32("APP__MESSAGE_PAGE_SIZE") {
        settings.message_page_size = v;
    }
    if let Ok(raw) = std::env::var("APP__NEAR_TOP_THRESHOLD") {
        if let Ok(parsed) = raw.parse::<f64>() {
            settings.near_top_threshold = parsed;
        }
    }

    settings
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok()?.parse::<u32>().ok().filter(|v| *v > 0)
}
