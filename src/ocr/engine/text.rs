/// Collapses engine output into a single trimmed line.
///
/// Line breaks become single spaces; blank lines are kept as extra spaces.
pub fn normalize_recognized_text(raw: &str) -> String {
    raw.lines().collect::<Vec<_>>().join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_columns_into_one_line() {
        assert_eq!(
            normalize_recognized_text("  おはよう\nございます\n"),
            "おはよう ございます"
        );
        assert_eq!(normalize_recognized_text("a\r\nb"), "a b");
        assert_eq!(normalize_recognized_text("a\n\nb"), "a  b");
    }

    #[test]
    fn whitespace_only_becomes_empty() {
        assert_eq!(normalize_recognized_text("\n \n\t"), "");
        assert_eq!(normalize_recognized_text(""), "");
    }
}
