pub mod credential;
#[cfg(test)]
pub mod memory;
pub mod oauth_link;
pub mod session;
pub mod user;
pub mod verification_code;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use derive_more::Display;
use surrealdb::{
    engine::remote::ws::{Client, Ws},
    opt::auth::Root,
    sql::statements::{BeginStatement, CommitStatement},
    Surreal,
};

use crate::utils::schemas;

pub use credential::CredentialStore;
pub use oauth_link::OauthLinkStore;
pub use session::SessionStore;
pub use user::UserStore;
pub use verification_code::VerificationCodeStore;

/// Storage faults, translated once at the store boundary. Callers branch on
/// the kind and never inspect backend message text.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    AlreadyExists,
    Conflict,
    Backend(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(error: surrealdb::Error) -> Self {
        match &error {
            surrealdb::Error::Db(surrealdb::error::Db::IndexExists { .. }) => {
                StoreError::AlreadyExists
            }
            surrealdb::Error::Db(surrealdb::error::Db::Thrown(_)) => StoreError::Conflict,
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

/// One unit of work. Writes are not visible to other callers until `commit`;
/// dropping an uncommitted transaction discards them.
#[async_trait]
pub trait AuthTx:
    UserStore + CredentialStore + SessionStore + VerificationCodeStore + OauthLinkStore + Send + Sync
{
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AuthTx>, StoreError>;
}

#[derive(Clone)]
pub struct DatabaseLayer {
    pub namespace: String,
    pub database: String,
    db: Surreal<Client>,
}

impl DatabaseLayer {
    pub async fn new(
        username: String,
        password: String,
        url: String,
        namespace: String,
        database: String,
    ) -> Result<Self, surrealdb::Error> {
        let db = Surreal::new::<Ws>(url).await?;

        db.signin(Root {
            username: username.as_str(),
            password: password.as_str(),
        })
        .await?;

        db.use_ns(namespace.clone()).use_db(database.clone()).await?;

        Ok(Self {
            namespace,
            database,
            db,
        })
    }

    pub async fn initialize_schemas(&self) -> Result<(), surrealdb::Error> {
        let schemas = [
            schemas::USER_SCHEMA,
            schemas::CREDENTIAL_SCHEMA,
            schemas::SESSION_SCHEMA,
            schemas::VERIFICATION_CODE_SCHEMA,
            schemas::OAUTH_LINK_SCHEMA,
        ];

        for schema_query in schemas {
            self.db.query(schema_query).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl AuthStore for DatabaseLayer {
    async fn begin(&self) -> Result<Box<dyn AuthTx>, StoreError> {
        Ok(Box::new(SurrealTx::new(self.db.clone())))
    }
}

pub(crate) enum BindValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Datetime(surrealdb::sql::Datetime),
}

pub(crate) struct StagedStatement {
    text: String,
    binds: Vec<(String, BindValue)>,
}

/// Surreal-backed unit of work. Reads run immediately; writes are staged and
/// submitted as a single `BEGIN`/`COMMIT` batch, with guard statements
/// re-checking race-sensitive preconditions inside the transaction.
pub struct SurrealTx {
    pub(crate) db: Surreal<Client>,
    staged: Mutex<Vec<StagedStatement>>,
    counter: AtomicUsize,
}

impl SurrealTx {
    fn new(db: Surreal<Client>) -> Self {
        Self {
            db,
            staged: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    /// Bind names must be unique across the whole batch, so every staged
    /// statement prefixes its parameters.
    pub(crate) fn bind_prefix(&self) -> String {
        format!("p{}_", self.counter.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn stage(&self, text: String, binds: Vec<(String, BindValue)>) {
        let mut staged = self.staged.lock().unwrap_or_else(|e| e.into_inner());
        staged.push(StagedStatement { text, binds });
    }
}

#[async_trait]
impl AuthTx for SurrealTx {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let staged = this.staged.into_inner().unwrap_or_else(|e| e.into_inner());

        if staged.is_empty() {
            return Ok(());
        }

        let mut query = this.db.query(BeginStatement::default());
        for statement in staged {
            query = query.query(statement.text);
            for (name, value) in statement.binds {
                query = match value {
                    BindValue::Str(v) => query.bind((name, v)),
                    BindValue::Bool(v) => query.bind((name, v)),
                    BindValue::Int(v) => query.bind((name, v)),
                    BindValue::Datetime(v) => query.bind((name, v)),
                };
            }
        }

        let response = query.query(CommitStatement::default()).await?;
        response.check()?;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Nothing reached the database; dropping the staged batch is enough.
        Ok(())
    }
}
