use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key has an empty path segment")]
    EmptySegment,
    #[error("sprite key segment '{segment}' traverses upward")]
    ParentTraversal { segment: String },
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Sprite keys are relative asset paths (`items/coin`, `player`): lowercase
/// ascii, digits, `_`, `-`, with `/` separating non-empty segments. They are
/// joined onto the asset root, so anything that could escape it is rejected.
pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(SpriteKeyError::EmptySegment);
        }
        if segment == "." || segment == ".." {
            return Err(SpriteKeyError::ParentTraversal {
                segment: segment.to_string(),
            });
        }
        for character in segment.chars() {
            if character.is_ascii_lowercase()
                || character.is_ascii_digit()
                || matches!(character, '_' | '-')
            {
                continue;
            }
            return Err(SpriteKeyError::InvalidCharacter { character });
        }
    }
    Ok(())
}
