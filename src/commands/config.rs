use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// `CONFIG GET <parameter>`: looks the parameter up in the read-only settings
/// supplied at process start and replies with a `[name, value]` array. Only
/// the GET subcommand is supported.
///
/// Ref: <https://redis.io/docs/latest/commands/config-get/>
#[derive(Debug, PartialEq)]
pub struct Config {
    pub parameter: String,
}

impl Executable for Config {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match store.settings().get(&self.parameter) {
            Some(value) => Ok(Frame::Array(vec![
                Frame::Bulk(Bytes::from(self.parameter)),
                Frame::Bulk(Bytes::from(value.to_string())),
            ])),
            None => Ok(Frame::Error(format!(
                "ERR unknown CONFIG parameter '{}'",
                self.parameter
            ))),
        }
    }
}

impl TryFrom<&mut CommandParser> for Config {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let subcommand = parser.next_string()?;

        if !subcommand.eq_ignore_ascii_case("get") {
            return Err(CommandParserError::InvalidCommandArgument {
                command: "CONFIG".to_string(),
                argument: subcommand,
            }
            .into());
        }

        let parameter = parser.next_string()?;

        Ok(Self { parameter })
    }
}
