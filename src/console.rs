//! Line-oriented command interpreter in front of a [`Dao`].

use crate::domain::model::Record;
use crate::domain::ports::{Dao, RecordIter};
use crate::utils::error::{KvError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const USAGE: &str = "Supported commands:\
\n\tget <key>\
\n\tput <key> <value>\
\n\tremove <key>\
\n\trange <from> [<to>]\
\n\tcompact\
\n\thelp\
\n\tquit";

pub fn banner(engine: &str) -> String {
    format!("Welcome to {} Key-Value DAO!\n{}", engine, USAGE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: Vec<u8> },
    Put { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
    Range { from: Vec<u8>, to: Option<Vec<u8>> },
    Compact,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines parse to `None`.
    ///
    /// Tokens are separated by single spaces. The value of `put` is the rest
    /// of the line after the key, so it may contain spaces.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = split_token(line);
        let command = match name {
            "get" => Command::Get {
                key: required(name, "key", split_token(rest).0)?,
            },
            "put" => {
                let (key, value) = split_token(rest);
                Command::Put {
                    key: required(name, "key", key)?,
                    value: required(name, "value", value)?,
                }
            }
            "remove" => Command::Remove {
                key: required(name, "key", split_token(rest).0)?,
            },
            "range" => {
                let (from, rest) = split_token(rest);
                let to = split_token(rest).0;
                Command::Range {
                    from: required(name, "from", from)?,
                    to: (!to.is_empty()).then(|| to.as_bytes().to_vec()),
                }
            }
            "compact" => Command::Compact,
            "help" => Command::Help,
            "quit" => Command::Quit,
            other => {
                return Err(KvError::UnsupportedCommand {
                    command: other.to_string(),
                })
            }
        };
        Ok(Some(command))
    }
}

fn split_token(input: &str) -> (&str, &str) {
    input.split_once(' ').unwrap_or((input, ""))
}

fn required(command: &str, argument: &str, token: &str) -> Result<Vec<u8>> {
    if token.is_empty() {
        return Err(KvError::MissingArgument {
            command: command.to_string(),
            argument: argument.to_string(),
        });
    }
    Ok(token.as_bytes().to_vec())
}

pub enum Reply<'a> {
    Value(Vec<u8>),
    Absent,
    /// Streamed to the output as it is read from the store.
    Records(RecordIter<'a>),
    Usage,
    Done,
}

pub struct Console {
    dao: Box<dyn Dao>,
}

impl Console {
    pub fn new(dao: Box<dyn Dao>) -> Self {
        Self { dao }
    }

    pub fn dao(&self) -> &dyn Dao {
        self.dao.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn Dao> {
        self.dao
    }

    pub fn execute(&mut self, command: &Command) -> Result<Reply<'_>> {
        tracing::debug!("Executing {:?}", command);

        match command {
            Command::Get { key } => match self.dao.get(key) {
                Ok(value) => Ok(Reply::Value(value)),
                Err(KvError::NotFound { .. }) => Ok(Reply::Absent),
                Err(e) => Err(e),
            },
            Command::Put { key, value } => {
                self.dao.upsert(key, value)?;
                Ok(Reply::Done)
            }
            Command::Remove { key } => {
                self.dao.remove(key)?;
                Ok(Reply::Done)
            }
            Command::Range { from, to } => Ok(Reply::Records(self.dao.range(from, to.as_deref())?)),
            Command::Compact => {
                self.dao.compact()?;
                Ok(Reply::Done)
            }
            Command::Help => Ok(Reply::Usage),
            Command::Quit => Ok(Reply::Done),
        }
    }

    /// Runs commands from `input` until `quit` or end of input.
    /// Returns the number of commands executed.
    pub async fn run<R, W>(&mut self, mut input: R, output: &mut W) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut executed = 0;

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                let error = KvError::InvalidInput {
                    reason: "line is not valid UTF-8".to_string(),
                };
                report(output, &error).await?;
                continue;
            };

            let command = match Command::parse(line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    report(output, &e).await?;
                    continue;
                }
            };

            if command == Command::Quit {
                break;
            }

            match self.execute(&command) {
                Ok(reply) => write_reply(output, reply).await?,
                Err(e) => report(output, &e).await?,
            }
            executed += 1;
        }

        output.flush().await?;
        tracing::debug!("Session ended after {} commands", executed);
        Ok(executed)
    }
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, reply: Reply<'_>) -> Result<()> {
    match reply {
        Reply::Value(value) => {
            let text = format!("{}\n", String::from_utf8_lossy(&value));
            output.write_all(text.as_bytes()).await?
        }
        Reply::Absent => output.write_all(b"absent\n").await?,
        Reply::Records(records) => {
            for record in records {
                match record {
                    Ok(record) => output.write_all(record_line(&record).as_bytes()).await?,
                    Err(e) => {
                        report(output, &e).await?;
                        break;
                    }
                }
            }
        }
        Reply::Usage => output.write_all(format!("{}\n", USAGE).as_bytes()).await?,
        Reply::Done => return Ok(()),
    }
    output.flush().await?;
    Ok(())
}

fn record_line(record: &Record) -> String {
    format!(
        "{} {}\n",
        String::from_utf8_lossy(record.key()),
        String::from_utf8_lossy(record.value())
    )
}

async fn report<W: AsyncWrite + Unpin>(output: &mut W, error: &KvError) -> Result<()> {
    tracing::error!("{}", error);
    output
        .write_all(format!("error: {}\n", error).as_bytes())
        .await?;
    output.flush().await?;
    Ok(())
}
