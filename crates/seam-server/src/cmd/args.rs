//! Command argument parsing.
//!
//! Two layers: a getopt-style flag parser driven by each command's
//! template string (`"dc:t:x:y:"` — a colon marks a value-taking flag),
//! and a command-string splitter that turns one line into `;`-separated
//! argv lists with shell-like quoting.

use std::collections::HashMap;

/// Parsed arguments: flag map plus positionals.
#[derive(Debug, Default, Clone)]
pub struct Args {
    flags: HashMap<char, Option<String>>,
    pub positionals: Vec<String>,
}

impl Args {
    /// Parse `argv` (without the command name) against a template.
    pub fn parse(template: &str, argv: &[String]) -> Result<Args, String> {
        let mut takes_value = HashMap::new();
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            let has_value = chars.peek() == Some(&':');
            if has_value {
                chars.next();
            }
            takes_value.insert(ch, has_value);
        }

        let mut args = Args::default();
        let mut iter = argv.iter().peekable();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                args.positionals.extend(iter.cloned());
                break;
            }
            if let Some(body) = arg.strip_prefix('-')
                && !body.is_empty()
                && !body.starts_with(|c: char| c.is_ascii_digit())
            {
                let mut flag_chars = body.chars().peekable();
                while let Some(flag) = flag_chars.next() {
                    match takes_value.get(&flag) {
                        None => return Err(format!("unknown flag: -{flag}")),
                        Some(false) => {
                            args.flags.insert(flag, None);
                        }
                        Some(true) => {
                            // Value is the rest of this word or the next.
                            let rest: String = flag_chars.by_ref().collect();
                            let value = if rest.is_empty() {
                                iter.next()
                                    .cloned()
                                    .ok_or_else(|| format!("-{flag} requires an argument"))?
                            } else {
                                rest
                            };
                            args.flags.insert(flag, Some(value));
                        }
                    }
                }
            } else {
                args.positionals.push(arg.clone());
                // Everything after the first positional stays positional.
                args.positionals.extend(iter.cloned());
                break;
            }
        }
        Ok(args)
    }

    /// Whether a flag was given.
    #[must_use]
    pub fn has(&self, flag: char) -> bool {
        self.flags.contains_key(&flag)
    }

    /// The value of a value-taking flag.
    #[must_use]
    pub fn value(&self, flag: char) -> Option<&str> {
        self.flags.get(&flag).and_then(|v| v.as_deref())
    }

    /// Enforce a positional-count range.
    pub fn check_count(&self, lower: usize, upper: usize, usage: &str) -> Result<(), String> {
        let n = self.positionals.len();
        if n < lower || n > upper {
            return Err(format!("usage: {usage}"));
        }
        Ok(())
    }
}

/// Split a command line into `;`-separated argv lists.
///
/// Handles double and single quotes, backslash escapes, and `#` comments
/// (outside quotes). An unterminated quote is an error.
pub fn split_command_string(input: &str) -> Result<Vec<Vec<String>>, String> {
    let mut lists = Vec::new();
    let mut argv: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = input.chars().peekable();

    macro_rules! end_word {
        () => {
            if in_word {
                argv.push(std::mem::take(&mut word));
                in_word = false;
            }
        };
    }

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' => end_word!(),
            ';' => {
                end_word!();
                if !argv.is_empty() {
                    lists.push(std::mem::take(&mut argv));
                }
            }
            '#' => break,
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => word.push(c),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        None => return Err("unterminated double quote".to_string()),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => word.push(c),
                            None => return Err("trailing backslash".to_string()),
                        },
                        Some(c) => word.push(c),
                    }
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        None => return Err("unterminated single quote".to_string()),
                        Some('\'') => break,
                        Some(c) => word.push(c),
                    }
                }
            }
            _ => {
                in_word = true;
                word.push(ch);
            }
        }
    }
    end_word!();
    if !argv.is_empty() {
        lists.push(argv);
    }
    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_and_positionals() {
        let args = Args::parse("ds:t:", &argv(&["-d", "-t", "main:1", "echo", "hi"])).unwrap();
        assert!(args.has('d'));
        assert_eq!(args.value('t'), Some("main:1"));
        assert_eq!(args.positionals, argv(&["echo", "hi"]));
    }

    #[test]
    fn combined_short_flags() {
        let args = Args::parse("dxv", &argv(&["-dx"])).unwrap();
        assert!(args.has('d'));
        assert!(args.has('x'));
        assert!(!args.has('v'));
    }

    #[test]
    fn attached_flag_value() {
        let args = Args::parse("t:", &argv(&["-tmain"])).unwrap();
        assert_eq!(args.value('t'), Some("main"));
    }

    #[test]
    fn unknown_flag_rejected() {
        assert!(Args::parse("d", &argv(&["-z"])).is_err());
    }

    #[test]
    fn missing_value_rejected() {
        assert!(Args::parse("t:", &argv(&["-t"])).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let args = Args::parse("d", &argv(&["--", "-d", "x"])).unwrap();
        assert!(!args.has('d'));
        assert_eq!(args.positionals, argv(&["-d", "x"]));
    }

    #[test]
    fn flags_after_positional_stay_positional() {
        let args = Args::parse("d", &argv(&["echo", "-d"])).unwrap();
        assert_eq!(args.positionals, argv(&["echo", "-d"]));
    }

    #[test]
    fn negative_number_is_positional() {
        let args = Args::parse("t:", &argv(&["-5"])).unwrap();
        assert_eq!(args.positionals, argv(&["-5"]));
    }

    #[test]
    fn split_simple() {
        assert_eq!(
            split_command_string("new-window -n shell").unwrap(),
            vec![argv(&["new-window", "-n", "shell"])]
        );
    }

    #[test]
    fn split_semicolon_lists() {
        assert_eq!(
            split_command_string("neww ; splitw -h").unwrap(),
            vec![argv(&["neww"]), argv(&["splitw", "-h"])]
        );
    }

    #[test]
    fn split_quotes() {
        assert_eq!(
            split_command_string(r#"rename-window "my window" 'and this'"#).unwrap(),
            vec![argv(&["rename-window", "my window", "and this"])]
        );
    }

    #[test]
    fn split_escapes() {
        assert_eq!(
            split_command_string(r"send-keys a\ b").unwrap(),
            vec![argv(&["send-keys", "a b"])]
        );
    }

    #[test]
    fn split_comment_ignored() {
        assert_eq!(
            split_command_string("kill-server # boom").unwrap(),
            vec![argv(&["kill-server"])]
        );
    }

    #[test]
    fn split_quoted_semicolon_stays() {
        assert_eq!(
            split_command_string(r#"send-keys "a;b""#).unwrap(),
            vec![argv(&["send-keys", "a;b"])]
        );
    }

    #[test]
    fn split_unterminated_quote_errors() {
        assert!(split_command_string("echo \"oops").is_err());
        assert!(split_command_string("echo 'oops").is_err());
    }

    #[test]
    fn split_empty_is_empty() {
        assert!(split_command_string("   ").unwrap().is_empty());
        assert!(split_command_string("# all comment").unwrap().is_empty());
    }
}
