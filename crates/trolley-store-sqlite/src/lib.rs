use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, QueryBuilder, Sqlite, SqlitePool};
use trolley_activity::{
    ActivityEvent, ActivityFilter, ActivityId, ActivityLog, ActivityLogError, ActivityType,
};
use trolley_identity::{CredentialStore, IdentityError, StoredSession, UserCredentials};
use trolley_storage::{
    AddMembershipParams, CreateInviteParams, CreateItemParams, CreateListParams,
    CreateProfileParams, CreatedList, Invite, InviteId, ItemId, ItemStatus, List, ListId,
    ListItem, ListRole, Membership, MembershipId, Profile, Store, StoreError,
    UpdateItemStatusParams, UserId,
};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let url = if url.starts_with("sqlite:") && !url.contains(":memory:") && !url.contains('?')
        {
            format!("{url}?mode=rwc")
        } else {
            url.to_string()
        };

        // A single connection serializes writers and keeps `:memory:` alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&url)
            .await
            .map_err(backend)?;

        MIGRATOR.run(&pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Cheap liveness probe used by the readiness endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

// ───────────────────────────── Row mapping ─────────────────────────────

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Unique violations become `AlreadyExists`, dangling references `NotFound`.
fn classify(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::AlreadyExists;
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
        if db.is_check_violation() {
            return StoreError::Conflict;
        }
    }
    backend(e)
}

/// Inserting an invite can trip two unique indexes: a token collision is
/// retryable (`AlreadyExists`), a second active row for the list is not.
fn classify_invite_insert(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return if db.message().contains("list_invites.token") {
                StoreError::AlreadyExists
            } else {
                StoreError::Conflict
            };
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    backend(e)
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_opt_uuid(s: Option<String>) -> Result<Option<Uuid>, StoreError> {
    s.as_deref().map(parse_uuid).transpose()
}

fn from_micros(v: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(v)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {v}")))
}

fn from_opt_micros(v: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    v.map(from_micros).transpose()
}

/// Current time truncated to the stored precision.
fn now() -> (i64, DateTime<Utc>) {
    let micros = Utc::now().timestamp_micros();
    let at = DateTime::from_timestamp_micros(micros).unwrap_or_default();
    (micros, at)
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    username: Option<String>,
    avatar_url: Option<String>,
    created_at: i64,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(r: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: UserId(parse_uuid(&r.id)?),
            email: r.email,
            username: r.username,
            avatar_url: r.avatar_url,
            created_at: from_micros(r.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListRow {
    id: String,
    name: String,
    created_by: String,
    created_at: i64,
    updated_at: i64,
    archived_at: Option<i64>,
    invite_token: Option<String>,
}

impl TryFrom<ListRow> for List {
    type Error = StoreError;

    fn try_from(r: ListRow) -> Result<Self, Self::Error> {
        Ok(List {
            id: ListId(parse_uuid(&r.id)?),
            name: r.name,
            created_by: UserId(parse_uuid(&r.created_by)?),
            created_at: from_micros(r.created_at)?,
            updated_at: from_micros(r.updated_at)?,
            archived_at: from_opt_micros(r.archived_at)?,
            invite_token: r.invite_token,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: String,
    list_id: String,
    user_id: String,
    role: String,
    joined_at: i64,
}

impl TryFrom<MemberRow> for Membership {
    type Error = StoreError;

    fn try_from(r: MemberRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            id: MembershipId(parse_uuid(&r.id)?),
            list_id: ListId(parse_uuid(&r.list_id)?),
            user_id: UserId(parse_uuid(&r.user_id)?),
            role: r
                .role
                .parse::<ListRole>()
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            joined_at: from_micros(r.joined_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InviteRow {
    id: String,
    list_id: String,
    token: String,
    created_by: String,
    created_at: i64,
    expires_at: i64,
    invalidated_at: Option<i64>,
}

impl TryFrom<InviteRow> for Invite {
    type Error = StoreError;

    fn try_from(r: InviteRow) -> Result<Self, Self::Error> {
        Ok(Invite {
            id: InviteId(parse_uuid(&r.id)?),
            list_id: ListId(parse_uuid(&r.list_id)?),
            token: r.token,
            created_by: UserId(parse_uuid(&r.created_by)?),
            created_at: from_micros(r.created_at)?,
            expires_at: from_micros(r.expires_at)?,
            invalidated_at: from_opt_micros(r.invalidated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    seq: i64,
    id: String,
    list_id: String,
    name: String,
    description: Option<String>,
    status: String,
    added_by: String,
    assigned_to: Option<String>,
    created_at: i64,
    updated_at: i64,
    completed_at: Option<i64>,
}

impl TryFrom<ItemRow> for ListItem {
    type Error = StoreError;

    fn try_from(r: ItemRow) -> Result<Self, Self::Error> {
        Ok(ListItem {
            id: ItemId(parse_uuid(&r.id)?),
            list_id: ListId(parse_uuid(&r.list_id)?),
            name: r.name,
            description: r.description,
            status: r
                .status
                .parse::<ItemStatus>()
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            added_by: UserId(parse_uuid(&r.added_by)?),
            assigned_to: parse_opt_uuid(r.assigned_to)?.map(UserId),
            created_at: from_micros(r.created_at)?,
            updated_at: from_micros(r.updated_at)?,
            completed_at: from_opt_micros(r.completed_at)?,
            seq: r.seq,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    list_id: String,
    user_id: String,
    activity_type: String,
    target_item_id: Option<String>,
    target_user_id: Option<String>,
    details: Option<String>,
    created_at: i64,
}

impl TryFrom<ActivityRow> for ActivityEvent {
    type Error = ActivityLogError;

    fn try_from(r: ActivityRow) -> Result<Self, Self::Error> {
        let db = |e: StoreError| ActivityLogError::Database(e.to_string());
        Ok(ActivityEvent {
            id: ActivityId(parse_uuid(&r.id).map_err(db)?),
            list_id: parse_uuid(&r.list_id).map_err(db)?,
            user_id: parse_uuid(&r.user_id).map_err(db)?,
            activity_type: r
                .activity_type
                .parse::<ActivityType>()
                .map_err(ActivityLogError::Database)?,
            target_item_id: parse_opt_uuid(r.target_item_id).map_err(db)?,
            target_user_id: parse_opt_uuid(r.target_user_id).map_err(db)?,
            details: r
                .details
                .map(|d| serde_json::from_str(&d))
                .transpose()
                .map_err(|e| ActivityLogError::Database(e.to_string()))?,
            created_at: from_micros(r.created_at).map_err(db)?,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const LIST_COLUMNS: &str =
    "l.id, l.name, l.created_by, l.created_at, l.updated_at, l.archived_at, l.invite_token";
const INVITE_COLUMNS: &str =
    "id, list_id, token, created_by, created_at, expires_at, invalidated_at";
const ITEM_COLUMNS: &str = "seq, id, list_id, name, description, status, added_by, assigned_to, \
                            created_at, updated_at, completed_at";

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Profiles ─────────────────────────────

    async fn create_profile(&self, params: &CreateProfileParams) -> Result<Profile, StoreError> {
        let (micros, created_at) = now();
        sqlx::query("INSERT INTO profiles(id, email, username, created_at) VALUES(?, ?, ?, ?)")
            .bind(params.id.0.to_string())
            .bind(&params.email)
            .bind(&params.username)
            .bind(micros)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(Profile {
            id: params.id.clone(),
            email: params.email.clone(),
            username: params.username.clone(),
            avatar_url: None,
            created_at,
        })
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, username, avatar_url, created_at FROM profiles WHERE id = ?",
        )
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_profiles(&self, user_ids: &[UserId]) -> Result<Vec<Profile>, StoreError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, email, username, avatar_url, created_at FROM profiles WHERE id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in user_ids {
            ids.push_bind(id.0.to_string());
        }
        ids.push_unseparated(")");

        let rows = qb
            .build_query_as::<ProfileRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        collect(rows)
    }

    // ───────────────────────────── Lists ─────────────────────────────

    async fn create_list(&self, params: &CreateListParams) -> Result<CreatedList, StoreError> {
        let (micros, at) = now();
        let list_id = Uuid::now_v7();
        let membership_id = Uuid::now_v7();
        let invite_id = Uuid::now_v7();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO lists(id, name, created_by, created_at, updated_at, invite_token)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(list_id.to_string())
        .bind(&params.name)
        .bind(params.created_by.0.to_string())
        .bind(micros)
        .bind(micros)
        .bind(&params.invite_token)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "INSERT INTO list_members(id, list_id, user_id, role, joined_at)
             VALUES(?, ?, ?, ?, ?)",
        )
        .bind(membership_id.to_string())
        .bind(list_id.to_string())
        .bind(params.created_by.0.to_string())
        .bind(ListRole::Owner.as_str())
        .bind(micros)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "INSERT INTO list_invites(id, list_id, token, created_by, created_at, expires_at)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(invite_id.to_string())
        .bind(list_id.to_string())
        .bind(&params.invite_token)
        .bind(params.created_by.0.to_string())
        .bind(micros)
        .bind(params.invite_expires_at.timestamp_micros())
        .execute(&mut *tx)
        .await
        .map_err(classify_invite_insert)?;

        tx.commit().await.map_err(backend)?;

        let list_id = ListId(list_id);
        Ok(CreatedList {
            list: List {
                id: list_id.clone(),
                name: params.name.clone(),
                created_by: params.created_by.clone(),
                created_at: at,
                updated_at: at,
                archived_at: None,
                invite_token: Some(params.invite_token.clone()),
            },
            owner: Membership {
                id: MembershipId(membership_id),
                list_id: list_id.clone(),
                user_id: params.created_by.clone(),
                role: ListRole::Owner,
                joined_at: at,
            },
            invite: Invite {
                id: InviteId(invite_id),
                list_id,
                token: params.invite_token.clone(),
                created_by: params.created_by.clone(),
                created_at: at,
                expires_at: from_micros(params.invite_expires_at.timestamp_micros())?,
                invalidated_at: None,
            },
        })
    }

    async fn get_list(&self, list_id: &ListId) -> Result<List, StoreError> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists l WHERE l.id = ?"
        ))
        .bind(list_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_lists_for_user(&self, user_id: &UserId) -> Result<Vec<List>, StoreError> {
        let rows = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {LIST_COLUMNS}
               FROM lists l
               JOIN list_members m ON m.list_id = l.id
              WHERE m.user_id = ?
              ORDER BY l.created_at, l.id"
        ))
        .bind(user_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn delete_list(&self, list_id: &ListId) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM lists WHERE id = ?")
            .bind(list_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ───────────────────────────── Memberships ─────────────────────────────

    async fn get_membership(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Membership, StoreError> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, list_id, user_id, role, joined_at
               FROM list_members WHERE list_id = ? AND user_id = ?",
        )
        .bind(list_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn add_membership(&self, params: &AddMembershipParams) -> Result<Membership, StoreError> {
        let (micros, joined_at) = now();
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO list_members(id, list_id, user_id, role, joined_at)
             VALUES(?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(params.list_id.0.to_string())
        .bind(params.user_id.0.to_string())
        .bind(params.role.as_str())
        .bind(micros)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(Membership {
            id: MembershipId(id),
            list_id: params.list_id.clone(),
            user_id: params.user_id.clone(),
            role: params.role,
            joined_at,
        })
    }

    async fn remove_membership(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM list_members WHERE list_id = ? AND user_id = ?")
            .bind(list_id.0.to_string())
            .bind(user_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_memberships(&self, list_ids: &[ListId]) -> Result<Vec<Membership>, StoreError> {
        if list_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, list_id, user_id, role, joined_at FROM list_members WHERE list_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in list_ids {
            ids.push_bind(id.0.to_string());
        }
        ids.push_unseparated(")");
        qb.push(" ORDER BY joined_at, rowid");

        let rows = qb
            .build_query_as::<MemberRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        collect(rows)
    }

    // ───────────────────────────── Invites ─────────────────────────────

    async fn get_active_invite(&self, list_id: &ListId) -> Result<Invite, StoreError> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM list_invites
              WHERE list_id = ? AND invalidated_at IS NULL"
        ))
        .bind(list_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn get_invite_by_token(&self, token: &str) -> Result<Invite, StoreError> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM list_invites WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn rotate_invite(&self, params: &CreateInviteParams) -> Result<Invite, StoreError> {
        let (micros, at) = now();
        let id = Uuid::now_v7();
        let list_id = params.list_id.0.to_string();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM lists WHERE id = ?")
            .bind(&list_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "UPDATE list_invites SET invalidated_at = ?
              WHERE list_id = ? AND invalidated_at IS NULL",
        )
        .bind(micros)
        .bind(&list_id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "INSERT INTO list_invites(id, list_id, token, created_by, created_at, expires_at)
             VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&list_id)
        .bind(&params.token)
        .bind(params.created_by.0.to_string())
        .bind(micros)
        .bind(params.expires_at.timestamp_micros())
        .execute(&mut *tx)
        .await
        .map_err(classify_invite_insert)?;

        sqlx::query("UPDATE lists SET invite_token = ?, updated_at = ? WHERE id = ?")
            .bind(&params.token)
            .bind(micros)
            .bind(&list_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        Ok(Invite {
            id: InviteId(id),
            list_id: params.list_id.clone(),
            token: params.token.clone(),
            created_by: params.created_by.clone(),
            created_at: at,
            expires_at: from_micros(params.expires_at.timestamp_micros())?,
            invalidated_at: None,
        })
    }

    async fn list_invites(&self, list_id: &ListId) -> Result<Vec<Invite>, StoreError> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {INVITE_COLUMNS} FROM list_invites
              WHERE list_id = ? ORDER BY created_at, rowid"
        ))
        .bind(list_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    // ───────────────────────────── Items ─────────────────────────────

    async fn create_item(&self, params: &CreateItemParams) -> Result<ListItem, StoreError> {
        let (micros, at) = now();
        let id = Uuid::now_v7();
        let res = sqlx::query(
            "INSERT INTO list_items(id, list_id, name, description, status, added_by,
                                    assigned_to, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(params.list_id.0.to_string())
        .bind(&params.name)
        .bind(&params.description)
        .bind(ItemStatus::Open.as_str())
        .bind(params.added_by.0.to_string())
        .bind(params.assigned_to.as_ref().map(|u| u.0.to_string()))
        .bind(micros)
        .bind(micros)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(ListItem {
            id: ItemId(id),
            list_id: params.list_id.clone(),
            name: params.name.clone(),
            description: params.description.clone(),
            status: ItemStatus::Open,
            added_by: params.added_by.clone(),
            assigned_to: params.assigned_to.clone(),
            created_at: at,
            updated_at: at,
            completed_at: None,
            seq: res.last_insert_rowid(),
        })
    }

    async fn get_item(&self, item_id: &ItemId) -> Result<ListItem, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM list_items WHERE id = ?"
        ))
        .bind(item_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_items(&self, list_id: &ListId) -> Result<Vec<ListItem>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM list_items
              WHERE list_id = ? ORDER BY created_at, seq"
        ))
        .bind(list_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn delete_item(&self, item_id: &ItemId) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM list_items WHERE id = ?")
            .bind(item_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_item_status(
        &self,
        params: &UpdateItemStatusParams,
    ) -> Result<ListItem, StoreError> {
        let (micros, _) = now();
        let res = sqlx::query(
            "UPDATE list_items SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(params.status.as_str())
        .bind(params.completed_at.map(|t| t.timestamp_micros()))
        .bind(micros)
        .bind(params.item_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_item(&params.item_id).await
    }
}

#[async_trait::async_trait]
impl ActivityLog for SqliteStore {
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityLogError> {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ActivityLogError::Database(e.to_string()))?;

        sqlx::query(
            "INSERT INTO list_activity(id, list_id, user_id, activity_type, target_item_id,
                                       target_user_id, details, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.list_id.to_string())
        .bind(event.user_id.to_string())
        .bind(event.activity_type.as_str())
        .bind(event.target_item_id.map(|u| u.to_string()))
        .bind(event.target_user_id.map(|u| u.to_string()))
        .bind(details)
        .bind(event.created_at.timestamp_micros())
        .execute(&self.pool)
        .await
        .map_err(|e| ActivityLogError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, filter: ActivityFilter) -> Result<Vec<ActivityEvent>, ActivityLogError> {
        if filter.limit == Some(0) {
            return Err(ActivityLogError::InvalidFilter("limit must be positive".into()));
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, list_id, user_id, activity_type, target_item_id, target_user_id,
                    details, created_at
               FROM list_activity WHERE list_id = ",
        );
        qb.push_bind(filter.list_id.0.to_string());
        if let Some(user_id) = &filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id.0.to_string());
        }
        if let Some(kind) = filter.activity_type {
            qb.push(" AND activity_type = ").push_bind(kind.as_str());
        }
        if let Some(before) = filter.before {
            qb.push(" AND created_at < ").push_bind(before.timestamp_micros());
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb
            .build_query_as::<ActivityRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ActivityLogError::Database(e.to_string()))?;
        rows.into_iter().map(ActivityEvent::try_from).collect()
    }
}

// ───────────────────────────── Credentials ─────────────────────────────

fn identity_backend(e: sqlx::Error) -> IdentityError {
    IdentityError::Backend(e.to_string())
}

fn identity_row(e: StoreError) -> IdentityError {
    IdentityError::Backend(e.to_string())
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: String,
    email: String,
    password_hash: String,
}

impl TryFrom<CredentialRow> for UserCredentials {
    type Error = IdentityError;

    fn try_from(r: CredentialRow) -> Result<Self, Self::Error> {
        Ok(UserCredentials {
            user_id: UserId(parse_uuid(&r.user_id).map_err(identity_row)?),
            email: r.email,
            password_hash: r.password_hash,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: String,
    expires_at: i64,
}

impl TryFrom<SessionRow> for StoredSession {
    type Error = IdentityError;

    fn try_from(r: SessionRow) -> Result<Self, Self::Error> {
        Ok(StoredSession {
            user_id: UserId(parse_uuid(&r.user_id).map_err(identity_row)?),
            expires_at: from_micros(r.expires_at).map_err(identity_row)?,
        })
    }
}

#[async_trait::async_trait]
impl CredentialStore for SqliteStore {
    async fn insert_user(&self, user: &UserCredentials) -> Result<(), IdentityError> {
        let (micros, _) = now();
        sqlx::query(
            "INSERT INTO credentials(user_id, email, password_hash, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(user.user_id.0.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(micros)
        .execute(&self.pool)
        .await
        .map_err(|e| match classify(e) {
            StoreError::AlreadyExists => IdentityError::EmailTaken,
            other => identity_row(other),
        })?;
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, IdentityError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, email, password_hash FROM credentials WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(identity_backend)?
        .map(UserCredentials::try_from)
        .transpose()
    }

    async fn user_by_id(&self, user_id: &UserId) -> Result<Option<UserCredentials>, IdentityError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, email, password_hash FROM credentials WHERE user_id = ?",
        )
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(identity_backend)?
        .map(UserCredentials::try_from)
        .transpose()
    }

    async fn set_password_hash(
        &self,
        user_id: &UserId,
        password_hash: &str,
    ) -> Result<(), IdentityError> {
        let res = sqlx::query("UPDATE credentials SET password_hash = ? WHERE user_id = ?")
            .bind(password_hash)
            .bind(user_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(identity_backend)?;
        if res.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError> {
        let mut tx = self.pool.begin().await.map_err(identity_backend)?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id.0.to_string())
            .execute(&mut *tx)
            .await
            .map_err(identity_backend)?;
        let res = sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(user_id.0.to_string())
            .execute(&mut *tx)
            .await
            .map_err(identity_backend)?;
        if res.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }
        tx.commit().await.map_err(identity_backend)?;
        Ok(())
    }

    async fn insert_session(
        &self,
        digest: &str,
        session: &StoredSession,
    ) -> Result<(), IdentityError> {
        sqlx::query("INSERT INTO sessions(token_digest, user_id, expires_at) VALUES(?, ?, ?)")
            .bind(digest)
            .bind(session.user_id.0.to_string())
            .bind(session.expires_at.timestamp_micros())
            .execute(&self.pool)
            .await
            .map_err(|e| match classify(e) {
                StoreError::NotFound => IdentityError::UserNotFound,
                other => identity_row(other),
            })?;
        Ok(())
    }

    async fn get_session(&self, digest: &str) -> Result<Option<StoredSession>, IdentityError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT user_id, expires_at FROM sessions WHERE token_digest = ?",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(identity_backend)?
        .map(StoredSession::try_from)
        .transpose()
    }

    async fn delete_session(&self, digest: &str) -> Result<(), IdentityError> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = ?")
            .bind(digest)
            .execute(&self.pool)
            .await
            .map_err(identity_backend)?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, IdentityError> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp_micros())
            .execute(&self.pool)
            .await
            .map_err(identity_backend)?;
        Ok(res.rows_affected())
    }
}
