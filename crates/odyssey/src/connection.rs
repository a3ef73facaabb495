//! Connections and their lifecycle.
//!
//! A [`ConnectionProvider`] owns exactly one physical connection. The executor never holds
//! it open between operations: every call goes through [`ConnectionProvider::run_scoped`],
//! which opens, runs, and always closes.
//!
//! Statements reach the connection with `@Name` placeholders and a list of named
//! [`Param`]s. Each connection maps those to whatever its driver expects; for Postgres
//! that is [`rewrite_placeholders`].

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::mapper::DataRecord;
use crate::value::Value;
use std::future::Future;
use std::pin::Pin;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, Transaction};

/// A value bound to the placeholder `@name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Value,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An open database session that can run statements.
pub trait Connection: Send + Sync {
    /// Row type produced by queries.
    type Row: DataRecord + Send;

    /// Run a statement and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = OrmResult<Vec<Self::Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Param]) -> impl Future<Output = OrmResult<u64>> + Send;
}

/// Future returned by the work passed to [`ConnectionProvider::run_scoped`].
pub type ScopedFuture<'c, T> = Pin<Box<dyn Future<Output = OrmResult<T>> + Send + 'c>>;

/// Owner of one connection.
pub trait ConnectionProvider: Send {
    type Conn: Connection;

    /// Open the connection. Opening an open connection is a no-op.
    fn open(&mut self) -> impl Future<Output = OrmResult<()>> + Send;

    /// Close the connection. Closing a closed connection is a no-op.
    fn close(&mut self) -> impl Future<Output = OrmResult<()>> + Send;

    fn is_open(&self) -> bool;

    /// The open connection, or a connection error when closed.
    fn connection(&self) -> OrmResult<&Self::Conn>;

    /// SQL flavor the compiler should emit for this connection.
    fn dialect(&self) -> Dialect {
        Dialect::default()
    }

    /// Open if needed, run `work`, then close, whether `work` succeeded or not.
    ///
    /// When both `work` and the close fail, the error from `work` is returned and the close
    /// failure is logged.
    ///
    /// ```ignore
    /// let n = provider
    ///     .run_scoped(move |conn| Box::pin(async move { conn.execute(&sql, &params).await }))
    ///     .await?;
    /// ```
    fn run_scoped<T, F>(&mut self, work: F) -> impl Future<Output = OrmResult<T>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(&'c Self::Conn) -> ScopedFuture<'c, T> + Send,
    {
        async move {
            if !self.is_open() {
                self.open()
                    .await
                    .map_err(|e| lifecycle("Error opening the database connection", e))?;
                tracing::trace!(target: "odyssey.connection", "connection opened");
            }

            let result = match self.connection() {
                Ok(conn) => work(conn).await,
                Err(e) => Err(e),
            };

            let closed = self
                .close()
                .await
                .map_err(|e| lifecycle("Error closing the database connection", e));
            tracing::trace!(target: "odyssey.connection", "connection closed");

            match (result, closed) {
                (Ok(value), Ok(())) => Ok(value),
                (Ok(_), Err(close_err)) => Err(close_err),
                (Err(err), Ok(())) => Err(err),
                (Err(err), Err(close_err)) => {
                    tracing::warn!(
                        target: "odyssey.connection",
                        error = %close_err,
                        "closing the connection failed after an earlier error"
                    );
                    Err(err)
                }
            }
        }
    }
}

fn lifecycle(message: &str, err: OrmError) -> OrmError {
    if err.is_connection() {
        err
    } else {
        OrmError::connection(message, err)
    }
}

/// Rewrite `@Name` placeholders to Postgres positional `$n` parameters.
///
/// Returns the rewritten SQL and, for each `$n` in order, the index into `names` of the
/// value to bind. A name used twice gets the same `$n`. Placeholders with no matching name
/// and anything inside a single-quoted string literal are left untouched.
pub fn rewrite_placeholders(sql: &str, names: &[&str]) -> (String, Vec<usize>) {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut chars = sql.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if in_string {
            out.push(ch);
            if ch == '\'' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '\'' => {
                in_string = true;
                out.push(ch);
            }
            '@' => {
                let name_start = start + 1;
                let mut name_end = name_start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name_end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &sql[name_start..name_end];
                match names.iter().position(|n| *n == name) {
                    Some(index) if !name.is_empty() => {
                        let slot = match order.iter().position(|&o| o == index) {
                            Some(existing) => existing,
                            None => {
                                order.push(index);
                                order.len() - 1
                            }
                        };
                        out.push('$');
                        out.push_str(&(slot + 1).to_string());
                    }
                    _ => {
                        out.push('@');
                        out.push_str(name);
                    }
                }
            }
            _ => out.push(ch),
        }
    }

    (out, order)
}

/// Positional Postgres statement built from named params.
fn positional<'a>(sql: &str, params: &'a [Param]) -> (String, Vec<&'a (dyn ToSql + Sync)>) {
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    let (sql, order) = rewrite_placeholders(sql, &names);
    let values = order
        .into_iter()
        .map(|i| &params[i].value as &(dyn ToSql + Sync))
        .collect();
    (sql, values)
}

impl Connection for Client {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Row>> {
        let (sql, values) = positional(sql, params);
        Client::query(self, sql.as_str(), &values)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let (sql, values) = positional(sql, params);
        Client::execute(self, sql.as_str(), &values)
            .await
            .map_err(OrmError::from_db_error)
    }
}

impl Connection for Transaction<'_> {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Row>> {
        let (sql, values) = positional(sql, params);
        Transaction::query(self, sql.as_str(), &values)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let (sql, values) = positional(sql, params);
        Transaction::execute(self, sql.as_str(), &values)
            .await
            .map_err(OrmError::from_db_error)
    }
}

/// A Postgres connection provider over `tokio_postgres`.
///
/// The connection string is handed to `tokio_postgres::connect` unmodified. A provider built
/// with [`PgConnection::from_client`] never connects or disconnects: the client stays open
/// across operations and its driver belongs to the caller.
///
/// ```ignore
/// let provider = PgConnection::new(std::env::var("DATABASE_URL")?);
/// let mut executor = QueryExecutor::new(provider);
/// ```
pub struct PgConnection {
    config: String,
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    external: bool,
}

impl PgConnection {
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            client: None,
            driver: None,
            external: false,
        }
    }

    /// Wrap an already connected client. The provider is open for its whole life.
    pub fn from_client(client: Client) -> Self {
        Self {
            config: String::new(),
            client: Some(client),
            driver: None,
            external: true,
        }
    }

    /// Whether the client was supplied by the caller.
    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn connection_string(&self) -> &str {
        &self.config
    }

    /// Start a transaction on the open connection.
    ///
    /// Compiled statements run inside it through its [`Connection`] impl.
    pub async fn begin_transaction(&mut self) -> OrmResult<Transaction<'_>> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| OrmError::connection_msg("The database connection is not open"))?;
        client.transaction().await.map_err(OrmError::from_db_error)
    }
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("open", &self.client.is_some())
            .field("external", &self.external)
            .finish_non_exhaustive()
    }
}

impl ConnectionProvider for PgConnection {
    type Conn = Client;

    async fn open(&mut self) -> OrmResult<()> {
        if self.client.is_some() {
            return Ok(());
        }
        let (client, connection) = tokio_postgres::connect(&self.config, NoTls)
            .await
            .map_err(|e| OrmError::connection("Error opening the database connection", e))?;
        self.driver = Some(tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "odyssey.connection", error = %e, "connection driver failed");
            }
        }));
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> OrmResult<()> {
        if self.external {
            return Ok(());
        }
        // dropping the client ends the driver task
        self.client = None;
        if let Some(driver) = self.driver.take() {
            driver
                .await
                .map_err(|e| OrmError::connection("Error closing the database connection", e))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn connection(&self) -> OrmResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| OrmError::connection_msg("The database connection is not open"))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}
