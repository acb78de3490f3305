//! Keyword classifier for transcripts
//!
//! Matching is case-insensitive substring containment and the first rule
//! that matches wins, so "please scan the room" still reaches object
//! detection. The occasional false positive is accepted.

use crate::collab::Screen;

/// Classified intent of a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(Screen),
    CancelSos,
    AnswerQuery(String),
    Unknown(String),
}

/// Ordered rules; earlier rules shadow later ones.
const RULES: &[(&[&str], Rule)] = &[
    (&["detect", "look", "scan"], Rule::Navigate(Screen::ObjectDetection)),
    (&["emergency", "help", "sos"], Rule::Navigate(Screen::Emergency)),
    (&["home", "dashboard"], Rule::Navigate(Screen::Dashboard)),
    (&["cancel", "stop"], Rule::CancelSos),
];

#[derive(Debug, Clone, Copy)]
enum Rule {
    Navigate(Screen),
    CancelSos,
}

/// Classify a transcript
pub fn interpret(transcript: &str) -> Action {
    let text = transcript.trim();
    if text.is_empty() {
        return Action::Unknown(String::new());
    }

    let lowered = text.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, rule)| match rule {
            Rule::Navigate(screen) => Action::Navigate(*screen),
            Rule::CancelSos => Action::CancelSos,
        })
        .unwrap_or_else(|| Action::AnswerQuery(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_phrasing_reaches_object_detection() {
        assert_eq!(
            interpret("please scan the room"),
            Action::Navigate(Screen::ObjectDetection)
        );
        assert_eq!(
            interpret("What do you LOOK at"),
            Action::Navigate(Screen::ObjectDetection)
        );
    }

    #[test]
    fn test_home_goes_to_dashboard() {
        assert_eq!(interpret("go home now"), Action::Navigate(Screen::Dashboard));
        assert_eq!(interpret("Dashboard"), Action::Navigate(Screen::Dashboard));
    }

    #[test]
    fn test_emergency_keywords() {
        assert_eq!(interpret("I need help"), Action::Navigate(Screen::Emergency));
        assert_eq!(interpret("send an SOS"), Action::Navigate(Screen::Emergency));
    }

    #[test]
    fn test_cancel_and_stop() {
        assert_eq!(interpret("cancel"), Action::CancelSos);
        assert_eq!(interpret("  Stop it "), Action::CancelSos);
    }

    #[test]
    fn test_first_rule_wins() {
        // "help" and "cancel" both match; emergency comes first
        assert_eq!(
            interpret("cancel help"),
            Action::Navigate(Screen::Emergency)
        );
        // "cancel sos" contains "sos" and lands on emergency, not cancel
        assert_eq!(interpret("cancel sos"), Action::Navigate(Screen::Emergency));
    }

    #[test]
    fn test_substring_false_positive_is_accepted() {
        // "homework" contains "home"
        assert_eq!(
            interpret("explain my homework"),
            Action::Navigate(Screen::Dashboard)
        );
    }

    #[test]
    fn test_other_text_is_a_query() {
        assert_eq!(
            interpret("  what time is it  "),
            Action::AnswerQuery("what time is it".to_string())
        );
    }

    #[test]
    fn test_blank_transcript_is_unknown() {
        assert_eq!(interpret(""), Action::Unknown(String::new()));
        assert_eq!(interpret(" \t\n "), Action::Unknown(String::new()));
    }
}
