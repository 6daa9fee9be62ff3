//! Canonical and display forms of nation and region names.
//!
//! The game addresses every nation and region by a canonical name:
//! lowercase, with spaces replaced by underscores. Feed text and the daily
//! dump both carry names in mixed forms, so every name entering the
//! registry passes through [`canonicalize`] first.

/// Base URL for nation and region profile pages.
pub const PROFILE_BASE_URL: &str = "https://www.nationstates.net";

/// Convert a raw name into its canonical registry key.
///
/// Surrounding whitespace is trimmed, letters are lower-cased and inner
/// spaces become underscores.
pub fn canonicalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Convert a canonical name into a human-readable display form.
///
/// Underscores become spaces and every word is title-cased: a letter is
/// upper-cased when it follows a non-letter, lower-cased otherwise.
pub fn display_name(canonical: &str) -> String {
    let mut out = String::with_capacity(canonical.len());
    let mut previous_was_letter = false;
    for ch in canonical.chars() {
        if ch == '_' {
            out.push(' ');
            previous_was_letter = false;
        } else if ch.is_alphabetic() {
            if previous_was_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_was_letter = true;
        } else {
            out.push(ch);
            previous_was_letter = false;
        }
    }
    out
}

/// Markdown link to a nation's profile page.
pub fn nation_link(name: &str) -> String {
    let canonical = canonicalize(name);
    format!(
        "[{}]({PROFILE_BASE_URL}/nation={canonical})",
        display_name(&canonical)
    )
}

/// Markdown link to a region's profile page.
pub fn region_link(name: &str) -> String {
    let canonical = canonicalize(name);
    format!(
        "[{}]({PROFILE_BASE_URL}/region={canonical})",
        display_name(&canonical)
    )
}

/// Levenshtein edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0_usize; b_chars.len().saturating_add(1)];

    for (i, ca) in a.chars().enumerate() {
        if let Some(first) = current.first_mut() {
            *first = i.saturating_add(1);
        }
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = previous
                .get(j)
                .copied()
                .unwrap_or(usize::MAX)
                .saturating_add(usize::from(ca != *cb));
            let deletion = previous
                .get(j.saturating_add(1))
                .copied()
                .unwrap_or(usize::MAX)
                .saturating_add(1);
            let insertion = current
                .get(j)
                .copied()
                .unwrap_or(usize::MAX)
                .saturating_add(1);
            if let Some(cell) = current.get_mut(j.saturating_add(1)) {
                *cell = substitution.min(deletion).min(insertion);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous.last().copied().unwrap_or(0)
}
