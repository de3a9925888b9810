//! Engine messages are written as if every line were line 1; this moves them
//! to the physical line they came from.

const PLACEHOLDER: &str = "line 1";

/// Rewrite `message` for line `number` whose trimmed text is `text`.
pub fn relocate(message: &str, number: usize, text: &str) -> String {
    if let Some(pos) = message.find(PLACEHOLDER) {
        let mut relocated = String::with_capacity(message.len() + 8);
        relocated.push_str(&message[..pos]);
        relocated.push_str(&format!("line {}", number));
        relocated.push_str(&message[pos + PLACEHOLDER.len()..]);
        return relocated;
    }

    if message.is_empty() {
        return format!("{}: '{}'", number, text);
    }
    if let Some(rest) = message.strip_prefix('1') {
        return format!("{}{}", number, rest);
    }
    format!("{}: {}", number, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_replaced_once() {
        assert_eq!(
            relocate("Undefined macro variable #3 in line 1", 42, "X#3"),
            "Undefined macro variable #3 in line 42"
        );
        assert_eq!(relocate("line 1 and line 1", 7, ""), "line 7 and line 1");
    }

    #[test]
    fn test_empty_message_quotes_the_line() {
        assert_eq!(relocate("", 5, "G01 X10 @"), "5: 'G01 X10 @'");
    }

    #[test]
    fn test_leading_line_number_is_spliced() {
        assert_eq!(relocate("1: Unknown word 'Q'", 12, "Q1"), "12: Unknown word 'Q'");
    }

    #[test]
    fn test_other_messages_are_prefixed() {
        assert_eq!(
            relocate("Feed rate is not specified for cutting motion", 3, "G01 X10"),
            "3: Feed rate is not specified for cutting motion"
        );
    }
}
