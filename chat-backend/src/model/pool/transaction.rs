//! Explicit transactions.
use std::ops::{Deref, DerefMut};

use super::{Connection, Error, PooledConnection};

/// `BEGIN` has run on the connection. Statements go through the transaction
/// (it derefs to [`Connection`]) until [`Transaction::commit`]. A transaction
/// dropped before that is rolled back.
pub struct Transaction {
    connection: PooledConnection,
    committed: bool,
}

impl Transaction {
    pub(crate) async fn begin(mut connection: PooledConnection) -> Result<Self, Error> {
        connection.query_cached("BEGIN", &[]).await?;

        Ok(Self {
            connection,
            committed: false,
        })
    }

    pub async fn commit(mut self) -> Result<(), Error> {
        self.connection.query_cached("COMMIT", &[]).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.committed {
            self.connection.rollback_on_release();
        }
    }
}

impl Deref for Transaction {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.connection
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }
}
