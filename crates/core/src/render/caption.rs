use crate::emotion::EmotionLabel;

const ELLIPSIS: char = '\u{2026}';

/// Cuts `text` to at most `max_chars` characters, ending in an ellipsis when
/// anything was removed.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out = out.trim_end().to_owned();
    out.push(ELLIPSIS);
    out
}

/// Greedy word wrap by character count. Words longer than `columns` are
/// split across lines.
pub fn wrap(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(columns);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > columns {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Caption lines for a frame: the label line, then the wrapped span text.
pub fn caption_lines(
    label: EmotionLabel,
    span: &str,
    max_chars: usize,
    columns: usize,
) -> Vec<String> {
    let mut lines = vec![format!("Emotion: {}", label.title())];
    lines.extend(wrap(&truncate_chars(span, max_chars), columns));
    lines
}
