/// Whitespace tokenizer with quote awareness: `'…'` and `"…"` runs are kept
/// as single tokens, quotes included. No escaping or nesting is interpreted;
/// an unterminated quote swallows the rest of the line as one token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                    current.push(ch);
                } else if ch == ' ' || ch == '\t' {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(ch);
                }
            }
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(tokenize("git  status\t-s"), vec!["git", "status", "-s"]);
    }

    #[test]
    fn quoted_strings_stay_single_tokens() {
        assert_eq!(
            tokenize("git commit -m 'fix the   thing'"),
            vec!["git", "commit", "-m", "'fix the   thing'"]
        );
        assert_eq!(
            tokenize(r#"echo "a b" c"#),
            vec!["echo", "\"a b\"", "c"]
        );
    }

    #[test]
    fn quote_adjacent_to_word_stays_attached() {
        assert_eq!(tokenize("grep -e'a b' f"), vec!["grep", "-e'a b'", "f"]);
    }

    #[test]
    fn unterminated_quote_swallows_rest() {
        assert_eq!(tokenize("echo 'a b c"), vec!["echo", "'a b c"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }
}
