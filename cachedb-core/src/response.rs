use std::fmt;

/// The single line a command answers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success,
    /// Key absent or expired, or a POP whose fields did not match
    Undefined,
    InvalidCommand,
    InvalidTtl,
    /// A stored username, as returned by GET
    Value(String),
    /// Per-item results of a multi-key command, in input order
    Batch(Vec<Response>),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success => f.write_str("SUCCESS"),
            Response::Undefined => f.write_str("UNDEFINED"),
            Response::InvalidCommand => f.write_str("INVALID_COMMAND"),
            Response::InvalidTtl => f.write_str("INVALID_TTL"),
            Response::Value(value) => f.write_str(value),
            Response::Batch(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}
