use super::GameState;
use crate::types::*;

/// (id, display name, static path) of the effects every game ships with
const BUILTIN_SOUNDS: &[(&str, &str, &str)] = &[
    ("timerTick", "Timer Tick", "/sounds/timer-tick.mp3"),
    ("timerEnd", "Timer End", "/sounds/timer-end.mp3"),
    ("correctAnswer", "Correct Answer", "/sounds/correct-answer.mp3"),
    ("wrongAnswer", "Wrong Answer", "/sounds/wrong-answer.mp3"),
    ("cardSelect", "Card Select", "/sounds/card-select.mp3"),
    ("buttonClick", "Button Click", "/sounds/button-click.mp3"),
    ("notification", "Notification", "/sounds/notification.mp3"),
];

pub fn builtin_sounds() -> Vec<Sound> {
    BUILTIN_SOUNDS
        .iter()
        .map(|(id, name, url)| Sound {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            builtin: true,
        })
        .collect()
}

/// `#rgb` or `#rrggbb`
fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Blank URLs mean "no image"
fn non_blank(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

impl GameState {
    pub fn set_colors(&mut self, colors: QuizColors) -> bool {
        if !colors.iter().all(is_hex_color) {
            tracing::debug!("Ignoring color set with a malformed entry");
            return false;
        }
        if colors == self.appearance.colors {
            return false;
        }
        self.appearance.colors = colors;
        true
    }

    pub fn reset_colors(&mut self) -> bool {
        self.set_colors(QuizColors::default())
    }

    pub fn add_sound(&mut self, sound: Sound) -> bool {
        if sound.name.trim().is_empty()
            || sound.url.trim().is_empty()
            || self.sounds.iter().any(|s| s.id == sound.id)
        {
            return false;
        }
        self.sounds.push(Sound {
            builtin: false,
            ..sound
        });
        true
    }

    /// Built-in effects cannot be removed
    pub fn remove_sound(&mut self, sound_id: &str) -> bool {
        let before = self.sounds.len();
        self.sounds.retain(|s| s.builtin || s.id != sound_id);
        self.sounds.len() != before
    }

    pub fn sound_url(&self, sound_id: &str) -> Option<&str> {
        self.sounds
            .iter()
            .find(|s| s.id == sound_id)
            .map(|s| s.url.as_str())
    }

    pub fn set_logo(&mut self, logo: LogoConfig) -> bool {
        let logo = LogoConfig {
            url: non_blank(logo.url),
            text: logo.text.filter(|t| !t.trim().is_empty()),
            size: logo.size.max(1),
        };
        if logo == self.appearance.logo {
            return false;
        }
        self.appearance.logo = logo;
        true
    }

    pub fn set_background(&mut self, background: BackgroundConfig) -> bool {
        let background = BackgroundConfig {
            image_url: non_blank(background.image_url),
            opacity: clamp_unit(background.opacity),
            size: background.size.max(1),
            position_x: background.position_x.min(100),
            position_y: background.position_y.min(100),
        };
        if background == self.appearance.background {
            return false;
        }
        self.appearance.background = background;
        true
    }

    pub fn set_question_window(&mut self, layer: ImageLayer) -> bool {
        let layer = ImageLayer {
            image_url: non_blank(layer.image_url),
            opacity: clamp_unit(layer.opacity),
        };
        if layer == self.appearance.question_window {
            return false;
        }
        self.appearance.question_window = layer;
        true
    }

    pub fn set_custom_message_image(&mut self, url: Option<String>) -> bool {
        let url = non_blank(url);
        if url == self.appearance.custom_message_image_url {
            return false;
        }
        self.appearance.custom_message_image_url = url;
        true
    }

    pub fn set_notification_display_time(&mut self, millis: u64) -> bool {
        let millis = millis.clamp(MIN_NOTIFICATION_MS, MAX_NOTIFICATION_MS);
        if millis == self.appearance.notification_display_ms {
            return false;
        }
        self.appearance.notification_display_ms = millis;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_validation() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#12abEF"));
        assert!(!is_hex_color("12abef"));
        assert!(!is_hex_color("#12abeg"));
        assert!(!is_hex_color("#1234"));
    }

    #[test]
    fn test_invalid_colors_are_ignored() {
        let mut state = GameState::new();
        let colors = QuizColors {
            correct: "green".to_string(),
            ..QuizColors::default()
        };
        assert!(!state.set_colors(colors));
        assert_eq!(state.appearance.colors, QuizColors::default());

        let colors = QuizColors {
            correct: "#00ff00".to_string(),
            ..QuizColors::default()
        };
        assert!(state.set_colors(colors));
        assert!(state.reset_colors());
        assert_eq!(state.appearance.colors, QuizColors::default());
    }

    #[test]
    fn test_builtin_sounds_survive_removal() {
        let mut state = GameState::new();
        assert!(!state.remove_sound("timerTick"));
        assert_eq!(state.sound_url("timerTick"), Some("/sounds/timer-tick.mp3"));
    }

    #[test]
    fn test_custom_sound_lifecycle() {
        let mut state = GameState::new();
        let sound = Sound {
            id: "custom-1".to_string(),
            name: "Drumroll".to_string(),
            url: "data:audio/mpeg;base64,AAAA".to_string(),
            builtin: true,
        };
        assert!(state.add_sound(sound.clone()));
        assert!(!state.add_sound(sound));
        // Uploaded sounds are never treated as built-in
        assert!(state.sounds.iter().any(|s| s.id == "custom-1" && !s.builtin));

        assert!(state.remove_sound("custom-1"));
        assert_eq!(state.sound_url("custom-1"), None);
    }

    #[test]
    fn test_background_values_are_clamped() {
        let mut state = GameState::new();
        state.set_background(BackgroundConfig {
            image_url: Some("  ".to_string()),
            opacity: 3.0,
            size: 0,
            position_x: 250,
            position_y: 10,
        });

        let bg = &state.appearance.background;
        assert_eq!(bg.image_url, None);
        assert_eq!(bg.opacity, 1.0);
        assert_eq!(bg.size, 1);
        assert_eq!(bg.position_x, 100);
        assert_eq!(bg.position_y, 10);
    }

    #[test]
    fn test_notification_time_is_clamped() {
        let mut state = GameState::new();
        assert!(state.set_notification_display_time(60_000));
        assert_eq!(state.appearance.notification_display_ms, MAX_NOTIFICATION_MS);
        assert!(state.set_notification_display_time(10));
        assert_eq!(state.appearance.notification_display_ms, MIN_NOTIFICATION_MS);
    }
}
