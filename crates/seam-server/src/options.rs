//! Option tables.
//!
//! A flat name→value map with typed values and a defaults table. Sessions
//! layer their map over the global one; lookups fall through to the
//! defaults so every option always resolves.

use std::collections::BTreeMap;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Number(i64),
    String(String),
    Flag(bool),
}

impl OptionValue {
    /// The value as a number, if it is one (flags count as 0/1).
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Flag(b) => Some(i64::from(*b)),
            OptionValue::String(_) => None,
        }
    }

    /// The value as a string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a flag (numbers coerce through != 0).
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            OptionValue::Flag(b) => Some(*b),
            OptionValue::Number(n) => Some(*n != 0),
            OptionValue::String(_) => None,
        }
    }

    /// Parse a user-supplied value against the default's type.
    pub fn parse_as(template: &OptionValue, input: &str) -> Result<OptionValue, String> {
        match template {
            OptionValue::Number(_) => input
                .parse::<i64>()
                .map(OptionValue::Number)
                .map_err(|_| format!("bad number: {input}")),
            OptionValue::String(_) => Ok(OptionValue::String(input.to_string())),
            OptionValue::Flag(_) => match input {
                "on" | "1" | "yes" => Ok(OptionValue::Flag(true)),
                "off" | "0" | "no" => Ok(OptionValue::Flag(false)),
                _ => Err(format!("bad flag: {input}")),
            },
        }
    }
}

/// The defaults table: every known option with its default value.
fn default_for(name: &str) -> Option<OptionValue> {
    use OptionValue::*;
    Some(match name {
        "base-index" => Number(0),
        "buffer-limit" => Number(20),
        "history-limit" => Number(2000),
        "remain-on-exit" => Flag(false),
        "status" => Flag(true),
        "window-size" => String("latest".into()),
        "automatic-rename" => Flag(true),
        "default-shell" => String(std::string::String::new()),
        "display-time" => Number(750),
        "escape-time" => Number(500),
        "mouse" => Flag(false),
        _ => return None,
    })
}

/// One layer of options (global or per-session).
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    /// An empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, validating the name and coercing to the default's
    /// type.
    pub fn set(&mut self, name: &str, input: &str) -> Result<(), String> {
        let template = default_for(name).ok_or_else(|| format!("unknown option: {name}"))?;
        let value = OptionValue::parse_as(&template, input)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Remove a local value, falling back to the layer below / defaults.
    pub fn unset(&mut self, name: &str) {
        self.values.remove(name);
    }

    /// Look up in this layer only.
    #[must_use]
    pub fn get_local(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Resolve through this layer, then `parent`, then the defaults.
    #[must_use]
    pub fn get<'a>(&'a self, parent: Option<&'a Options>, name: &str) -> Option<OptionValue> {
        if let Some(v) = self.values.get(name) {
            return Some(v.clone());
        }
        if let Some(parent) = parent
            && let Some(v) = parent.values.get(name)
        {
            return Some(v.clone());
        }
        default_for(name)
    }

    /// Resolve a numeric option (0 if somehow untyped).
    #[must_use]
    pub fn number(&self, parent: Option<&Options>, name: &str) -> i64 {
        self.get(parent, name)
            .and_then(|v| v.as_number())
            .unwrap_or(0)
    }

    /// Resolve a string option.
    #[must_use]
    pub fn string(&self, parent: Option<&Options>, name: &str) -> String {
        self.get(parent, name)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Resolve a flag option.
    #[must_use]
    pub fn flag(&self, parent: Option<&Options>, name: &str) -> bool {
        self.get(parent, name)
            .and_then(|v| v.as_flag())
            .unwrap_or(false)
    }

    /// Iterate the locally set values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_sets() {
        let opts = Options::new();
        assert_eq!(opts.number(None, "history-limit"), 2000);
        assert_eq!(opts.string(None, "window-size"), "latest");
        assert!(!opts.flag(None, "remain-on-exit"));
    }

    #[test]
    fn set_overrides_default() {
        let mut opts = Options::new();
        opts.set("history-limit", "500").unwrap();
        assert_eq!(opts.number(None, "history-limit"), 500);
        opts.unset("history-limit");
        assert_eq!(opts.number(None, "history-limit"), 2000);
    }

    #[test]
    fn session_layer_over_global() {
        let mut global = Options::new();
        global.set("buffer-limit", "50").unwrap();
        let mut session = Options::new();
        assert_eq!(session.number(Some(&global), "buffer-limit"), 50);
        session.set("buffer-limit", "5").unwrap();
        assert_eq!(session.number(Some(&global), "buffer-limit"), 5);
    }

    #[test]
    fn unknown_option_rejected() {
        let mut opts = Options::new();
        assert!(opts.set("no-such-option", "1").is_err());
    }

    #[test]
    fn type_coercion() {
        let mut opts = Options::new();
        assert!(opts.set("remain-on-exit", "on").is_ok());
        assert!(opts.flag(None, "remain-on-exit"));
        assert!(opts.set("remain-on-exit", "maybe").is_err());
        assert!(opts.set("history-limit", "abc").is_err());
    }
}
