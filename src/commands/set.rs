use bytes::Bytes;
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Set `key` to hold `value`, overwriting any previous value. The `PX`
/// option attaches a time-to-live in milliseconds; unrecognized option
/// tokens are ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Duration>,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        store.set(self.key, self.value, self.ttl);

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let mut ttl = None;

        loop {
            let option = match parser.next_string() {
                Ok(option) => option,
                Err(CommandParserError::EndOfStream) => break,
                Err(err) => return Err(err.into()),
            };

            match option.to_uppercase().as_str() {
                "PX" => {
                    let millis = parser.next_integer().map_err(|_| {
                        CommandParserError::InvalidCommandArgument {
                            command: "SET".to_string(),
                            argument: "PX".to_string(),
                        }
                    })?;

                    if millis < 0 {
                        return Err(CommandParserError::InvalidCommandArgument {
                            command: "SET".to_string(),
                            argument: "PX".to_string(),
                        }
                        .into());
                    }

                    ttl = Some(Duration::from_millis(millis as u64));
                }
                _ => continue,
            }
        }

        Ok(Self { key, value, ttl })
    }
}
