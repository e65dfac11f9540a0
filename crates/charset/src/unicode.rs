#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Script {
    Latin,
    Cyrillic,
    Greek,
    Other,
}

pub(crate) fn script_of(c: char) -> Script {
    match c as u32 {
        0x0400..=0x04FF => Script::Cyrillic,
        0x0370..=0x03FF => Script::Greek,
        cp if cp < 0x0250 && c.is_alphabetic() => Script::Latin,
        _ => Script::Other,
    }
}

/// Replacement character or C1 control: the code page has no text meaning for the byte.
pub(crate) fn is_noise(c: char) -> bool {
    c == char::REPLACEMENT_CHARACTER || ('\u{80}'..='\u{9F}').contains(&c)
}

/// Lowercase, UPPERCASE or Capitalized.
pub(crate) fn has_plausible_case(letters: &[char]) -> bool {
    if letters.iter().all(|c| !c.is_uppercase()) || letters.iter().all(|c| !c.is_lowercase()) {
        return true;
    }
    let mut iter = letters.iter();
    let first_upper = iter.next().is_some_and(|c| c.is_uppercase());
    first_upper && iter.all(|c| !c.is_uppercase())
}

pub(crate) fn to_lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_scripts() {
        assert_eq!(script_of('ж'), Script::Cyrillic);
        assert_eq!(script_of('Ω'), Script::Greek);
        assert_eq!(script_of('é'), Script::Latin);
        assert_eq!(script_of('a'), Script::Latin);
        assert_eq!(script_of('€'), Script::Other);
        assert_eq!(script_of('7'), Script::Other);
    }

    #[test]
    fn case_patterns() {
        let word = |s: &str| s.chars().collect::<Vec<_>>();
        assert!(has_plausible_case(&word("привет")));
        assert!(has_plausible_case(&word("ПРИВЕТ")));
        assert!(has_plausible_case(&word("Привет")));
        assert!(!has_plausible_case(&word("пРИВЕТ")));
        assert!(!has_plausible_case(&word("ПривеТ")));
    }

    #[test]
    fn noise_chars() {
        assert!(is_noise('\u{FFFD}'));
        assert!(is_noise('\u{85}'));
        assert!(!is_noise('é'));
    }
}
