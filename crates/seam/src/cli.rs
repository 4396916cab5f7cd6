//! Program flag parsing and socket path resolution.

use std::path::PathBuf;

/// Parsed command-line flags.
#[derive(Debug, Default)]
pub struct Cli {
    /// `-S`: explicit socket path.
    pub socket_path: Option<PathBuf>,
    /// `-L`: socket name within the default directory.
    pub socket_name: Option<String>,
    /// `-f`: configuration file (accepted; configuration parsing is not
    /// part of the server core).
    pub config_file: Option<PathBuf>,
    /// `-u`: force UTF-8.
    pub force_utf8: bool,
    /// `-2`: force 256 colors.
    pub force_256: bool,
    /// `-C`: control mode.
    pub control: bool,
    /// `-v`: verbosity, counted.
    pub verbose: u8,
    /// `-V`: print the version and exit.
    pub version: bool,
    /// Internal: run as the server on the given socket.
    pub server_mode: bool,
    /// Trailing words: one command list for the server.
    pub command: Vec<String>,
}

impl Cli {
    /// Parse `argv` (without the program name).
    pub fn parse(args: &[String]) -> Result<Cli, String> {
        let mut cli = Cli::default();
        let mut iter = args.iter().peekable();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-S" => {
                    cli.socket_path = Some(PathBuf::from(
                        iter.next().ok_or("-S requires a path")?,
                    ));
                }
                "-L" => {
                    cli.socket_name =
                        Some(iter.next().ok_or("-L requires a name")?.clone());
                }
                "-f" => {
                    cli.config_file = Some(PathBuf::from(
                        iter.next().ok_or("-f requires a file")?,
                    ));
                }
                "-u" => cli.force_utf8 = true,
                "-2" => cli.force_256 = true,
                "-C" => cli.control = true,
                "-v" => cli.verbose += 1,
                "-vv" => cli.verbose += 2,
                "-V" => cli.version = true,
                "--server" => cli.server_mode = true,
                other if other.starts_with('-') && other.len() > 1 => {
                    return Err(format!("unknown flag: {other}"));
                }
                _ => {
                    cli.command.push(arg.clone());
                    cli.command.extend(iter.cloned());
                    break;
                }
            }
        }
        Ok(cli)
    }

    /// The socket path: `-S`, or `$TMPDIR/seam-<uid>/<name>`.
    pub fn resolve_socket(&self) -> PathBuf {
        if let Some(path) = &self.socket_path {
            return path.clone();
        }
        let tmpdir = std::env::var("TMPDIR").unwrap_or_else(|_| "/tmp".to_string());
        let uid = rustix::process::getuid().as_raw();
        let name = self.socket_name.as_deref().unwrap_or("default");
        PathBuf::from(tmpdir)
            .join(format!("seam-{uid}"))
            .join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(words: &[&str]) -> Cli {
        let args: Vec<String> = words.iter().map(|s| s.to_string()).collect();
        Cli::parse(&args).unwrap()
    }

    #[test]
    fn flags_parse() {
        let cli = parse(&["-2", "-u", "-v", "-S", "/tmp/sock"]);
        assert!(cli.force_256);
        assert!(cli.force_utf8);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.socket_path, Some(PathBuf::from("/tmp/sock")));
    }

    #[test]
    fn trailing_words_form_command() {
        let cli = parse(&["new-session", "-s", "work"]);
        assert_eq!(cli.command, vec!["new-session", "-s", "work"]);
    }

    #[test]
    fn flags_stop_at_first_word() {
        let cli = parse(&["-u", "send-keys", "-t", "a", "-v"]);
        assert!(cli.force_utf8);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.command, vec!["send-keys", "-t", "a", "-v"]);
    }

    #[test]
    fn socket_name_resolves_under_tmpdir() {
        let cli = parse(&["-L", "other"]);
        let path = cli.resolve_socket();
        assert!(path.to_string_lossy().contains("seam-"));
        assert!(path.ends_with("other"));
    }

    #[test]
    fn unknown_flag_rejected() {
        let args = vec!["-Q".to_string()];
        assert!(Cli::parse(&args).is_err());
    }
}
