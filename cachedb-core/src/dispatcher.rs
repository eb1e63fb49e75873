use crate::command::{Command, Record, DEFAULT_TTL_SECONDS};
use crate::response::Response;
use crate::snapshot::{FileSnapshotSink, SnapshotSink};
use crate::store::Store;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Truncates a key for safe logging (prevents leaking sensitive key data)
fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    if key.chars().count() <= MAX_LOG_LEN {
        key.to_string()
    } else {
        format!("{}...", key.chars().take(MAX_LOG_LEN).collect::<String>())
    }
}

/// Runs blocking work, handing the worker thread back to the runtime when that is allowed
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Executes protocol lines against a [`Store`]
///
/// The dispatcher keeps no per-line state; feed it one line at a time and it answers
/// with exactly one line. Malformed input never produces an error, only a response.
///
/// `SAVE` calls the sink synchronously. On a multi-threaded Tokio runtime the call is
/// wrapped in [`tokio::task::block_in_place`] so a slow sink does not stall other tasks on
/// the worker; on a current-thread runtime it blocks the caller.
///
/// # Example
///
/// ```rust,no_run
/// use cachedb_core::{Dispatcher, FileSnapshotSink, Store};
///
/// #[tokio::main]
/// async fn main() {
///     let dispatcher = Dispatcher::new(Store::new(), FileSnapshotSink::default());
///
///     assert_eq!(dispatcher.process("PUT a { username: X } 100"), "SUCCESS");
///     assert_eq!(dispatcher.process("GET a"), "X");
/// }
/// ```
pub struct Dispatcher<S = FileSnapshotSink> {
    store: Store,
    sink: S,
}

impl<S: SnapshotSink> Dispatcher<S> {
    pub fn new(store: Store, sink: S) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Parses and executes one line, returning the response line
    pub fn process(&self, line: &str) -> String {
        let response = match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(error) => {
                tracing::debug!(%error, "rejected command");
                Response::InvalidCommand
            }
        };

        response.to_string()
    }

    /// Executes an already parsed command
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Put { key, record, ttl } => {
                let ttl = ttl.unwrap_or(DEFAULT_TTL_SECONDS);
                tracing::debug!("PUT {} (ttl: {}s)", truncate_key_for_log(&key), ttl);

                if ttl <= 0 {
                    return Response::InvalidTtl;
                }
                self.put(key, record, ttl)
            }
            Command::MPut { items, ttl } => {
                // The shared TTL is passed through as given, unlike PUT
                let ttl = ttl.unwrap_or(DEFAULT_TTL_SECONDS);
                tracing::debug!("MPUT {} item(s) (ttl: {}s)", items.len(), ttl);

                Response::Batch(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Ok((key, record)) => self.put(key, record, ttl),
                            Err(error) => {
                                tracing::debug!(%error, "rejected MPUT item");
                                Response::InvalidCommand
                            }
                        })
                        .collect(),
                )
            }
            Command::Get { key } => {
                tracing::debug!("GET {}", truncate_key_for_log(&key));
                self.get(&key)
            }
            Command::MGet { keys } => {
                tracing::debug!("MGET {} key(s)", keys.len());
                Response::Batch(keys.iter().map(|key| self.get(key)).collect())
            }
            Command::Del { key } => {
                tracing::debug!("DEL {}", truncate_key_for_log(&key));
                self.delete(&key)
            }
            Command::MDel { keys } => {
                tracing::debug!("MDEL {} key(s)", keys.len());
                Response::Batch(keys.iter().map(|key| self.delete(key)).collect())
            }
            Command::Save { key } => {
                tracing::debug!("SAVE {}", truncate_key_for_log(&key));
                self.save(&key)
            }
            Command::Pop { key, record } => {
                tracing::debug!("POP {}", truncate_key_for_log(&key));
                self.pop(&key, &record)
            }
        }
    }

    fn put(&self, key: String, record: Record, ttl: i64) -> Response {
        self.store.put(key, record.username, record.userdata, ttl);
        Response::Success
    }

    fn get(&self, key: &str) -> Response {
        match self.store.get(key) {
            Some(entry) => Response::Value(entry.username().to_string()),
            None => Response::Undefined,
        }
    }

    fn delete(&self, key: &str) -> Response {
        // Deleting an absent key still succeeds
        let _ = self.store.delete(key);
        Response::Success
    }

    fn save(&self, key: &str) -> Response {
        let Some(entry) = self.store.get(key) else {
            return Response::Undefined;
        };

        if let Err(error) = run_blocking(|| self.sink.persist(key, &entry)) {
            tracing::warn!(key = %truncate_key_for_log(key), %error, "snapshot failed");
        }
        Response::Success
    }

    fn pop(&self, key: &str, record: &Record) -> Response {
        // A missing entry is reported as a malformed POP, not as UNDEFINED
        let Some(entry) = self.store.get(key) else {
            return Response::InvalidCommand;
        };
        if !entry.matches(&record.username, &record.userdata) {
            return Response::Undefined;
        }

        match self
            .store
            .take_if(key, |live| live.matches(&record.username, &record.userdata))
        {
            Some(_) => Response::Success,
            // Expired or replaced since the lookup
            None => Response::InvalidCommand,
        }
    }
}
