use super::util::{downcast, friendship_store_error, is_dup_key};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::MySqlRow;
use sqlx::{Database, Decode, Encode, MySqlConnection, MySqlPool, Row, Type};

impl<'r, DB: Database> Decode<'r, DB> for FriendshipState
where
    &'r str: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<DB>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for FriendshipState
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        self.to_string().encode_by_ref(buf)
    }
}

impl<DB: Database> Type<DB> for FriendshipState
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        <String as Type<DB>>::type_info()
    }

    fn compatible(ty: &<DB as Database>::TypeInfo) -> bool {
        <String as Type<DB>>::compatible(ty)
    }
}

const SELECT_FRIENDSHIP: &str = r#"
SELECT id, owner_id, counterpart_id, state, initiator, created_at, updated_at
FROM user_friendship
"#;

fn row_to_edge(r: &MySqlRow) -> Result<FriendshipEdge, sqlx::Error> {
    Ok(FriendshipEdge::from_parts(
        r.try_get::<FriendshipId, _>("id")?,
        r.try_get::<UserId, _>("owner_id")?,
        r.try_get::<UserId, _>("counterpart_id")?,
        r.try_get::<FriendshipState, _>("state")?,
        r.try_get::<bool, _>("initiator")?,
        r.try_get::<DateTime<Utc>, _>("created_at")?,
        r.try_get::<DateTime<Utc>, _>("updated_at")?,
    ))
}

fn conn<'a>(tx: &'a mut dyn StorageTx<'_>) -> Result<&'a mut MySqlConnection, FriendshipError> {
    downcast(tx)
        .map(|tx| tx.conn())
        .map_err(|e| FriendshipError::Store(e.to_string()))
}

pub struct MySqlFriendshipRepo {
    pool: MySqlPool,
}

impl MySqlFriendshipRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MySqlFriendshipRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        edge: &FriendshipEdge,
    ) -> Result<(), FriendshipError> {
        if edge.owner_id() == edge.counterpart_id() {
            return Err(FriendshipError::SelfRelationship);
        }

        let res = sqlx::query(
            r#"
INSERT INTO user_friendship (id, owner_id, counterpart_id, state, initiator, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(edge.id())
        .bind(edge.owner_id())
        .bind(edge.counterpart_id())
        .bind(edge.state())
        .bind(edge.initiator())
        .bind(edge.created_at())
        .bind(edge.updated_at())
        .execute(conn(tx)?)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_dup_key(&e) => Err(FriendshipError::DuplicateRelationship),
            Err(e) => Err(friendship_store_error("insert friendship", e)),
        }
    }

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        let sql = format!("{SELECT_FRIENDSHIP} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(conn(tx)?)
            .await
            .map_err(|e| friendship_store_error("select friendship", e))?;

        row.as_ref()
            .map(row_to_edge)
            .transpose()
            .map_err(|e| friendship_store_error("decode friendship", e))
    }

    async fn find_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        let sql = format!("{SELECT_FRIENDSHIP} WHERE id = ? FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(conn(tx)?)
            .await
            .map_err(|e| friendship_store_error("lock friendship", e))?;

        row.as_ref()
            .map(row_to_edge)
            .transpose()
            .map_err(|e| friendship_store_error("decode friendship", e))
    }

    async fn find_by_pair_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        let sql = format!("{SELECT_FRIENDSHIP} WHERE owner_id = ? AND counterpart_id = ? FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(owner)
            .bind(counterpart)
            .fetch_optional(conn(tx)?)
            .await
            .map_err(|e| friendship_store_error("lock friendship by pair", e))?;

        row.as_ref()
            .map(row_to_edge)
            .transpose()
            .map_err(|e| friendship_store_error("decode friendship", e))
    }

    async fn lock_pair_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<MirrorPair, FriendshipError> {
        // both arguments orders produce the same statement, hence the same lock order
        let (lo, hi) = if owner < counterpart {
            (owner, counterpart)
        } else {
            (counterpart, owner)
        };
        let sql = format!(
            "{SELECT_FRIENDSHIP} WHERE (owner_id = ? AND counterpart_id = ?) \
             OR (owner_id = ? AND counterpart_id = ?) \
             ORDER BY owner_id, counterpart_id FOR UPDATE"
        );
        let rows = sqlx::query(&sql)
            .bind(lo)
            .bind(hi)
            .bind(hi)
            .bind(lo)
            .fetch_all(conn(tx)?)
            .await
            .map_err(|e| friendship_store_error("lock friendship pair", e))?;

        let mut pair: MirrorPair = (None, None);
        for row in &rows {
            let edge = row_to_edge(row).map_err(|e| friendship_store_error("decode friendship", e))?;
            if edge.owner_id() == owner {
                pair.0 = Some(edge);
            } else {
                pair.1 = Some(edge);
            }
        }
        Ok(pair)
    }

    async fn update_state_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        edge: &FriendshipEdge,
    ) -> Result<(), FriendshipError> {
        let res = sqlx::query(
            r#"
UPDATE user_friendship
SET state = ?, updated_at = ?
WHERE id = ?
"#,
        )
        .bind(edge.state())
        .bind(edge.updated_at())
        .bind(edge.id())
        .execute(conn(tx)?)
        .await
        .map_err(|e| friendship_store_error("update friendship", e))?;

        if res.rows_affected() == 0 {
            return Err(FriendshipError::NotFound);
        }
        Ok(())
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<bool, FriendshipError> {
        let res = sqlx::query("DELETE FROM user_friendship WHERE id = ?")
            .bind(id)
            .execute(conn(tx)?)
            .await
            .map_err(|e| friendship_store_error("delete friendship", e))?;

        Ok(res.rows_affected() > 0)
    }

    async fn find(&self, id: FriendshipId) -> Result<Option<FriendshipEdge>, FriendshipError> {
        let sql = format!("{SELECT_FRIENDSHIP} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| friendship_store_error("select friendship", e))?;

        row.as_ref()
            .map(row_to_edge)
            .transpose()
            .map_err(|e| friendship_store_error("decode friendship", e))
    }

    async fn find_by_pair(
        &self,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        let sql = format!("{SELECT_FRIENDSHIP} WHERE owner_id = ? AND counterpart_id = ?");
        let row = sqlx::query(&sql)
            .bind(owner)
            .bind(counterpart)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| friendship_store_error("select friendship by pair", e))?;

        row.as_ref()
            .map(row_to_edge)
            .transpose()
            .map_err(|e| friendship_store_error("decode friendship", e))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let sql = format!("{SELECT_FRIENDSHIP} WHERE owner_id = ? ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| friendship_store_error("list friendships", e))?;

        rows.iter()
            .map(row_to_edge)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| friendship_store_error("decode friendship", e))
    }
}
