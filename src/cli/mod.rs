pub(crate) mod command;
pub(crate) mod painter;
pub(crate) mod scan;
pub(crate) mod send;
pub(crate) mod watch;

use std::io;

use serde::Serialize;

pub use self::command::{Args, Command, FakeArgs, LinkMode, LinkSettings, LogLevel};
pub use self::send::{SendArgs, SendCommand};
pub use self::watch::WatchArgs;

/// Writes one compact JSON document followed by a newline.
pub(crate) fn write_json_line<W, T>(out: &mut W, value: &T) -> anyhow::Result<()>
where
    W: io::Write,
    T: Serialize,
{
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
