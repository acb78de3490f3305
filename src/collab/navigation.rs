//! Screen identifiers and the navigation callback

use serde::{Deserialize, Serialize};

/// Screens the host UI can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Dashboard,
    ObjectDetection,
    Emergency,
    Settings,
    TextReader,
    Navigation,
    Call,
    Connect,
}

impl Screen {
    /// Stable identifier used by the host UI
    pub fn id(&self) -> &'static str {
        match self {
            Screen::Dashboard => "dashboard",
            Screen::ObjectDetection => "object-detection",
            Screen::Emergency => "emergency",
            Screen::Settings => "settings",
            Screen::TextReader => "text-reader",
            Screen::Navigation => "navigation",
            Screen::Call => "call",
            Screen::Connect => "connect",
        }
    }

    /// Human-readable title, used in spoken confirmations
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::ObjectDetection => "Object Detection",
            Screen::Emergency => "Emergency SOS",
            Screen::Settings => "Settings",
            Screen::TextReader => "Text Reader",
            Screen::Navigation => "Navigation",
            Screen::Call => "Emergency Call",
            Screen::Connect => "Device Connection",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Navigation callback registered by the host UI.
///
/// Called synchronously from the controller loop, so implementations must
/// not block.
pub trait Navigator: Send {
    fn navigate(&mut self, screen: Screen);
}

impl<F> Navigator for F
where
    F: FnMut(Screen) + Send,
{
    fn navigate(&mut self, screen: Screen) {
        self(screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_id_matches_serde_name() {
        for screen in [
            Screen::Dashboard,
            Screen::ObjectDetection,
            Screen::Emergency,
            Screen::Settings,
            Screen::TextReader,
            Screen::Navigation,
            Screen::Call,
            Screen::Connect,
        ] {
            let json = serde_json::to_string(&screen).unwrap();
            assert_eq!(json, format!("\"{}\"", screen.id()));
        }
    }

    #[test]
    fn test_closure_is_a_navigator() {
        let mut visited = Vec::new();
        {
            let mut nav = |screen: Screen| visited.push(screen);
            nav.navigate(Screen::Emergency);
        }
        assert_eq!(visited, vec![Screen::Emergency]);
    }
}
