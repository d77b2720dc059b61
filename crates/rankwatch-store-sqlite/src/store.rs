//! [`SqliteStore`], the SQLite implementation of [`EntityStore`].
//!
//! Fact repositories live in [`crate::facts`], notification persistence in
//! [`crate::notifications`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, Row, params_from_iter, types::Value};
use uuid::Uuid;

use rankwatch_core::{
  entity::{
    Competitor, CompetitorUpdate, Keyword, NewCompetitor, NewPlace,
    NewPlaceKeyword, NewUser, Place, PlaceKeyword, PlaceKeywordDetail,
    PlaceUpdate, User, normalize_email,
  },
  store::{EntityStore, StoreBackend},
};

use crate::{
  Result,
  encode::{
    COMPETITOR_COLUMNS, KEYWORD_COLUMNS, PLACE_COLUMNS, PLACE_KEYWORD_COLUMNS,
    RawCompetitor, RawKeyword, RawPlace, RawPlaceKeyword, RawPlaceKeywordDetail,
    RawUser, USER_COLUMNS, encode_dt, encode_region, encode_uuid,
  },
  schema::SCHEMA,
};

/// Reads one raw row; decoding into domain types happens off the connection
/// thread.
pub(crate) type ReadRow<R> = fn(&Row<'_>) -> rusqlite::Result<R>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rankwatch store backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ─── Query helpers ─────────────────────────────────────────────────────

  pub(crate) async fn execute(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, params_from_iter(params.iter()))?))
      .await?;
    Ok(changed)
  }

  pub(crate) async fn query_all<R: Send + 'static>(
    &self,
    sql: String,
    params: Vec<Value>,
    read: ReadRow<R>,
  ) -> Result<Vec<R>> {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  pub(crate) async fn query_opt<R: Send + 'static>(
    &self,
    sql: String,
    params: Vec<Value>,
    read: ReadRow<R>,
  ) -> Result<Option<R>> {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params_from_iter(params.iter()), read)
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Apply a patch and read the row back in one round trip. `None` when the
  /// patch matched no row.
  pub(crate) async fn update_returning<R: Send + 'static>(
    &self,
    update: String,
    params: Vec<Value>,
    select: String,
    id: Uuid,
    read: ReadRow<R>,
  ) -> Result<Option<R>> {
    let id_str = encode_uuid(id);
    let row = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if tx.execute(&update, params_from_iter(params.iter()))? == 0 {
          return Ok(None);
        }
        let row = tx.query_row(&select, [id_str], read).optional()?;
        tx.commit()?;
        Ok(row)
      })
      .await?;
    Ok(row)
  }

  // ─── Typed readers ─────────────────────────────────────────────────────

  async fn user_where(&self, clause: &str, param: String) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
    self
      .query_opt(sql, vec![Value::Text(param)], RawUser::from_row)
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn place_where(
    &self,
    clause: &str,
    param: String,
  ) -> Result<Option<Place>> {
    let sql = format!("SELECT {PLACE_COLUMNS} FROM places WHERE {clause}");
    self
      .query_opt(sql, vec![Value::Text(param)], RawPlace::from_row)
      .await?
      .map(RawPlace::into_place)
      .transpose()
  }

  fn place_keyword_detail_sql(clause: &str) -> String {
    format!(
      "SELECT {PLACE_KEYWORD_COLUMNS}, k.text, p.name
         FROM place_keywords pk
         JOIN keywords k ON k.keyword_id = pk.keyword_id
         JOIN places   p ON p.place_id   = pk.place_id
        WHERE {clause}"
    )
  }
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl StoreBackend for SqliteStore {
  type Error = crate::Error;
}

impl EntityStore for SqliteStore {
  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let now = Utc::now();
    let user = User {
      user_id:    Uuid::new_v4(),
      email:      normalize_email(&input.email),
      name:       input.name.trim().to_owned(),
      is_active:  true,
      created_at: now,
      updated_at: now,
    };
    self
      .execute(
        format!(
          "INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        ),
        vec![
          Value::Text(encode_uuid(user.user_id)),
          Value::Text(user.email.clone()),
          Value::Text(user.name.clone()),
          Value::from(user.is_active),
          Value::Text(encode_dt(user.created_at)),
          Value::Text(encode_dt(user.updated_at)),
        ],
      )
      .await?;
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.user_where("user_id = ?1", encode_uuid(id)).await
  }

  async fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> Result<Option<User>> {
    self.user_where("email = ?1", normalize_email(email)).await
  }

  // ── Places ────────────────────────────────────────────────────────────

  async fn create_place(&self, input: NewPlace) -> Result<Place> {
    let now = Utc::now();
    let place = Place {
      place_id:    Uuid::new_v4(),
      user_id:     input.user_id,
      external_id: input.external_id,
      name:        input.name,
      category:    input.category,
      address:     input.address,
      url:         input.url,
      is_active:   true,
      created_at:  now,
      updated_at:  now,
    };
    self
      .execute(
        format!(
          "INSERT INTO places ({PLACE_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        vec![
          Value::Text(encode_uuid(place.place_id)),
          Value::Text(encode_uuid(place.user_id)),
          Value::Text(place.external_id.clone()),
          Value::Text(place.name.clone()),
          Value::from(place.category.clone()),
          Value::from(place.address.clone()),
          Value::from(place.url.clone()),
          Value::from(place.is_active),
          Value::Text(encode_dt(place.created_at)),
          Value::Text(encode_dt(place.updated_at)),
        ],
      )
      .await?;
    Ok(place)
  }

  async fn get_place(&self, id: Uuid) -> Result<Option<Place>> {
    self.place_where("place_id = ?1", encode_uuid(id)).await
  }

  async fn find_place_by_external_id<'a>(
    &'a self,
    external_id: &'a str,
  ) -> Result<Option<Place>> {
    self.place_where("external_id = ?1", external_id.to_owned()).await
  }

  async fn list_places(&self, user_id: Uuid) -> Result<Vec<Place>> {
    let sql = format!(
      "SELECT {PLACE_COLUMNS} FROM places WHERE user_id = ?1
       ORDER BY created_at, rowid"
    );
    self
      .query_all(sql, vec![Value::Text(encode_uuid(user_id))], RawPlace::from_row)
      .await?
      .into_iter()
      .map(RawPlace::into_place)
      .collect()
  }

  async fn update_place(
    &self,
    id: Uuid,
    patch: PlaceUpdate,
  ) -> Result<Option<Place>> {
    let update = "UPDATE places SET
        name       = COALESCE(?2, name),
        category   = COALESCE(?3, category),
        address    = COALESCE(?4, address),
        url        = COALESCE(?5, url),
        is_active  = COALESCE(?6, is_active),
        updated_at = ?7
      WHERE place_id = ?1"
      .to_owned();
    let params = vec![
      Value::Text(encode_uuid(id)),
      Value::from(patch.name),
      Value::from(patch.category),
      Value::from(patch.address),
      Value::from(patch.url),
      Value::from(patch.is_active),
      Value::Text(encode_dt(Utc::now())),
    ];
    let select = format!("SELECT {PLACE_COLUMNS} FROM places WHERE place_id = ?1");
    self
      .update_returning(update, params, select, id, RawPlace::from_row)
      .await?
      .map(RawPlace::into_place)
      .transpose()
  }

  // ── Keywords ──────────────────────────────────────────────────────────

  async fn find_or_create_keyword(&self, normalized: String) -> Result<Keyword> {
    let id_str = encode_uuid(Uuid::new_v4());
    let now_str = encode_dt(Utc::now());
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO keywords (keyword_id, text, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (text) DO NOTHING",
          rusqlite::params![id_str, normalized, now_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {KEYWORD_COLUMNS} FROM keywords WHERE text = ?1"),
          [&normalized],
          RawKeyword::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;
    raw.into_keyword()
  }

  async fn get_keyword(&self, id: Uuid) -> Result<Option<Keyword>> {
    let sql = format!("SELECT {KEYWORD_COLUMNS} FROM keywords WHERE keyword_id = ?1");
    self
      .query_opt(sql, vec![Value::Text(encode_uuid(id))], RawKeyword::from_row)
      .await?
      .map(RawKeyword::into_keyword)
      .transpose()
  }

  // ── Place keywords ────────────────────────────────────────────────────

  async fn create_place_keyword(
    &self,
    input: NewPlaceKeyword,
  ) -> Result<PlaceKeyword> {
    let now = Utc::now();
    let place_keyword = PlaceKeyword {
      place_keyword_id: Uuid::new_v4(),
      place_id:         input.place_id,
      keyword_id:       input.keyword_id,
      region:           input.region,
      is_active:        true,
      created_at:       now,
      updated_at:       now,
    };
    self
      .execute(
        "INSERT INTO place_keywords
           (place_keyword_id, place_id, keyword_id, region, is_active,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
          .to_owned(),
        vec![
          Value::Text(encode_uuid(place_keyword.place_keyword_id)),
          Value::Text(encode_uuid(place_keyword.place_id)),
          Value::Text(encode_uuid(place_keyword.keyword_id)),
          Value::Text(encode_region(place_keyword.region.as_deref())),
          Value::from(place_keyword.is_active),
          Value::Text(encode_dt(place_keyword.created_at)),
          Value::Text(encode_dt(place_keyword.updated_at)),
        ],
      )
      .await?;
    Ok(place_keyword)
  }

  async fn get_place_keyword(&self, id: Uuid) -> Result<Option<PlaceKeyword>> {
    let sql = format!(
      "SELECT {PLACE_KEYWORD_COLUMNS} FROM place_keywords pk
       WHERE pk.place_keyword_id = ?1"
    );
    self
      .query_opt(sql, vec![Value::Text(encode_uuid(id))], RawPlaceKeyword::from_row)
      .await?
      .map(RawPlaceKeyword::into_place_keyword)
      .transpose()
  }

  async fn get_place_keyword_detail(
    &self,
    id: Uuid,
  ) -> Result<Option<PlaceKeywordDetail>> {
    let sql = Self::place_keyword_detail_sql("pk.place_keyword_id = ?1");
    self
      .query_opt(
        sql,
        vec![Value::Text(encode_uuid(id))],
        RawPlaceKeywordDetail::from_row,
      )
      .await?
      .map(RawPlaceKeywordDetail::into_detail)
      .transpose()
  }

  async fn find_place_keyword(
    &self,
    place_id: Uuid,
    keyword_id: Uuid,
    region: Option<String>,
  ) -> Result<Option<PlaceKeyword>> {
    let sql = format!(
      "SELECT {PLACE_KEYWORD_COLUMNS} FROM place_keywords pk
       WHERE pk.place_id = ?1 AND pk.keyword_id = ?2 AND pk.region = ?3"
    );
    let params = vec![
      Value::Text(encode_uuid(place_id)),
      Value::Text(encode_uuid(keyword_id)),
      Value::Text(encode_region(region.as_deref())),
    ];
    self
      .query_opt(sql, params, RawPlaceKeyword::from_row)
      .await?
      .map(RawPlaceKeyword::into_place_keyword)
      .transpose()
  }

  async fn list_place_keywords(
    &self,
    place_id: Uuid,
  ) -> Result<Vec<PlaceKeywordDetail>> {
    let sql = format!(
      "{} ORDER BY pk.created_at, pk.rowid",
      Self::place_keyword_detail_sql("pk.place_id = ?1")
    );
    self
      .query_all(
        sql,
        vec![Value::Text(encode_uuid(place_id))],
        RawPlaceKeywordDetail::from_row,
      )
      .await?
      .into_iter()
      .map(RawPlaceKeywordDetail::into_detail)
      .collect()
  }

  async fn set_place_keyword_active(
    &self,
    id: Uuid,
    is_active: bool,
  ) -> Result<Option<PlaceKeyword>> {
    let update = "UPDATE place_keywords SET is_active = ?2, updated_at = ?3
                  WHERE place_keyword_id = ?1"
      .to_owned();
    let params = vec![
      Value::Text(encode_uuid(id)),
      Value::from(is_active),
      Value::Text(encode_dt(Utc::now())),
    ];
    let select = format!(
      "SELECT {PLACE_KEYWORD_COLUMNS} FROM place_keywords pk
       WHERE pk.place_keyword_id = ?1"
    );
    self
      .update_returning(update, params, select, id, RawPlaceKeyword::from_row)
      .await?
      .map(RawPlaceKeyword::into_place_keyword)
      .transpose()
  }

  // ── Competitors ───────────────────────────────────────────────────────

  async fn create_competitor(&self, input: NewCompetitor) -> Result<Competitor> {
    let now = Utc::now();
    let competitor = Competitor {
      competitor_id: Uuid::new_v4(),
      place_id:      input.place_id,
      external_id:   input.external_id,
      name:          input.name,
      category:      input.category,
      is_active:     true,
      created_at:    now,
      updated_at:    now,
    };
    self
      .execute(
        format!(
          "INSERT INTO competitors ({COMPETITOR_COLUMNS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        vec![
          Value::Text(encode_uuid(competitor.competitor_id)),
          Value::Text(encode_uuid(competitor.place_id)),
          Value::Text(competitor.external_id.clone()),
          Value::Text(competitor.name.clone()),
          Value::from(competitor.category.clone()),
          Value::from(competitor.is_active),
          Value::Text(encode_dt(competitor.created_at)),
          Value::Text(encode_dt(competitor.updated_at)),
        ],
      )
      .await?;
    Ok(competitor)
  }

  async fn get_competitor(&self, id: Uuid) -> Result<Option<Competitor>> {
    let sql = format!(
      "SELECT {COMPETITOR_COLUMNS} FROM competitors WHERE competitor_id = ?1"
    );
    self
      .query_opt(sql, vec![Value::Text(encode_uuid(id))], RawCompetitor::from_row)
      .await?
      .map(RawCompetitor::into_competitor)
      .transpose()
  }

  async fn find_competitor<'a>(
    &'a self,
    place_id: Uuid,
    external_id: &'a str,
  ) -> Result<Option<Competitor>> {
    let sql = format!(
      "SELECT {COMPETITOR_COLUMNS} FROM competitors
       WHERE place_id = ?1 AND external_id = ?2"
    );
    let params = vec![
      Value::Text(encode_uuid(place_id)),
      Value::Text(external_id.to_owned()),
    ];
    self
      .query_opt(sql, params, RawCompetitor::from_row)
      .await?
      .map(RawCompetitor::into_competitor)
      .transpose()
  }

  async fn list_competitors(&self, place_id: Uuid) -> Result<Vec<Competitor>> {
    let sql = format!(
      "SELECT {COMPETITOR_COLUMNS} FROM competitors WHERE place_id = ?1
       ORDER BY created_at, rowid"
    );
    self
      .query_all(
        sql,
        vec![Value::Text(encode_uuid(place_id))],
        RawCompetitor::from_row,
      )
      .await?
      .into_iter()
      .map(RawCompetitor::into_competitor)
      .collect()
  }

  async fn update_competitor(
    &self,
    id: Uuid,
    patch: CompetitorUpdate,
  ) -> Result<Option<Competitor>> {
    let update = "UPDATE competitors SET
        name       = COALESCE(?2, name),
        category   = COALESCE(?3, category),
        is_active  = COALESCE(?4, is_active),
        updated_at = ?5
      WHERE competitor_id = ?1"
      .to_owned();
    let params = vec![
      Value::Text(encode_uuid(id)),
      Value::from(patch.name),
      Value::from(patch.category),
      Value::from(patch.is_active),
      Value::Text(encode_dt(Utc::now())),
    ];
    let select = format!(
      "SELECT {COMPETITOR_COLUMNS} FROM competitors WHERE competitor_id = ?1"
    );
    self
      .update_returning(update, params, select, id, RawCompetitor::from_row)
      .await?
      .map(RawCompetitor::into_competitor)
      .transpose()
  }
}
