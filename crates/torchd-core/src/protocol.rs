//! Wire protocol between `torch` and `torchd`.
//!
//! A client writes one of the ASCII tokens `off`, `torch` or `red` to the
//! daemon socket, with no framing and no trailing newline. The daemon never
//! answers. Anything else is dropped.

use std::fmt;
use std::str::FromStr;

/// Maximum number of bytes the daemon reads per token.
pub const MAX_TOKEN_LEN: usize = 10;

/// A command accepted by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Off,
    Torch,
    Red,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Off, Command::Torch, Command::Red];

    /// The token sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Off => "off",
            Command::Torch => "torch",
            Command::Red => "red",
        }
    }

    /// Interpret one chunk read from a client.
    ///
    /// The chunk is cut at its first NUL byte, then compared byte-for-byte
    /// against the known tokens.
    pub fn from_token(chunk: &[u8]) -> Result<Command, UnknownCommand> {
        let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
        let token = &chunk[..end];
        Self::ALL
            .into_iter()
            .find(|command| command.as_str().as_bytes() == token)
            .ok_or_else(|| UnknownCommand(String::from_utf8_lossy(token).into_owned()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.as_bytes())
    }
}

/// A token that is not one of the known commands.
///
/// The daemon drops these without effect; the client refuses to send them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command `{0}`; available commands are 'off', 'torch', 'red'")]
pub struct UnknownCommand(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_tokens() {
        assert_eq!(Command::from_token(b"off"), Ok(Command::Off));
        assert_eq!(Command::from_token(b"torch"), Ok(Command::Torch));
        assert_eq!(Command::from_token(b"red"), Ok(Command::Red));
    }

    #[test]
    fn test_tokens_are_exact() {
        assert!(Command::from_token(b"off\n").is_err());
        assert!(Command::from_token(b"OFF").is_err());
        assert!(Command::from_token(b" red").is_err());
        assert!(Command::from_token(b"torches").is_err());
        assert!(Command::from_token(b"").is_err());
    }

    #[test]
    fn test_token_stops_at_nul() {
        assert_eq!(Command::from_token(b"red\0junk"), Ok(Command::Red));
        assert!(Command::from_token(b"\0red").is_err());
    }

    #[test]
    fn test_non_utf8_token_is_unknown() {
        let err = Command::from_token(&[0xff, 0xfe]).unwrap_err();
        assert_eq!(err.0, "\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_from_str_and_display() {
        for command in Command::ALL {
            assert_eq!(command.to_string().parse::<Command>(), Ok(command));
        }
    }

    #[test]
    fn test_unknown_command_message() {
        let err = "blink".parse::<Command>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown command `blink`; available commands are 'off', 'torch', 'red'"
        );
    }

    #[test]
    fn test_tokens_fit_in_one_read() {
        for command in Command::ALL {
            assert!(command.as_str().len() <= MAX_TOKEN_LEN);
        }
    }
}
