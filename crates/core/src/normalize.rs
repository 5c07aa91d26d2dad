//! Maps provider-native type tags and genre labels onto [`MediaKind`].
//!
//! Priority:
//! 1. Native tag lookup (series-like or animation-like tags).
//! 2. Any genre hint carrying an animation marker → cartoon.
//! 3. Film.

use crate::types::MediaKind;

/// Lowercase substrings that mark a genre label as animation.
pub const ANIMATION_MARKERS: &[&str] = &[
    "мульт",
    "аниме",
    "анимац",
    "animation",
    "anime",
    "cartoon",
];

/// Normalize a native type tag plus genre hints. Total: never fails.
pub fn normalize<S: AsRef<str>>(native_type: Option<&str>, genre_hints: &[S]) -> MediaKind {
    if let Some(kind) = native_type.and_then(lookup_native) {
        return kind;
    }

    if has_animation_marker(genre_hints) {
        return MediaKind::Cartoon;
    }

    MediaKind::Film
}

fn lookup_native(tag: &str) -> Option<MediaKind> {
    match tag.trim().to_ascii_uppercase().as_str() {
        "TV_SERIES" | "MINI_SERIES" | "TV_SHOW" | "SERIES" => Some(MediaKind::Series),
        "CARTOON" | "ANIME" | "ANIMATED_SERIES" => Some(MediaKind::Cartoon),
        _ => None,
    }
}

/// True for native tags describing an episodic title, animated or not.
pub fn is_episodic_tag(tag: &str) -> bool {
    matches!(
        tag.trim().to_ascii_uppercase().as_str(),
        "TV_SERIES" | "MINI_SERIES" | "TV_SHOW" | "ANIMATED_SERIES" | "SERIES"
    )
}

pub fn is_animation_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    ANIMATION_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn has_animation_marker<S: AsRef<str>>(genre_hints: &[S]) -> bool {
    genre_hints.iter().any(|g| is_animation_label(g.as_ref()))
}
