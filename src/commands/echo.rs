use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the message as a bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/echo>
#[derive(Debug, PartialEq)]
pub struct Echo {
    pub message: Bytes,
}

impl Executable for Echo {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        Ok(Frame::Bulk(self.message))
    }
}

impl TryFrom<&mut CommandParser> for Echo {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let message = parser.next_bytes()?;

        Ok(Self { message })
    }
}
