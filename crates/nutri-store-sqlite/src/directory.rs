//! [`Directory`] implementation: clients, groups and diet templates.

use chrono::Utc;
use nutri_core::{
  directory::{Client, DietTemplate, Directory, Group, NewClient},
  subject::{ClientId, GroupId},
};
use rusqlite::{OptionalExtension as _, params};

use crate::{
  Error, Result, SqliteStore,
  encode::{RawClient, RawTemplate, encode_dt, group_from_row},
};

const CLIENT_SELECT: &str = "SELECT id, name, group_id, is_active FROM clients";
const TEMPLATE_SELECT: &str =
  "SELECT id, name, content, created_at FROM diet_templates WHERE deleted_at IS NULL";

impl Directory for SqliteStore {
  type Error = Error;

  async fn add_group(&self, name: String) -> Result<Group> {
    let at_str = encode_dt(Utc::now());
    self
      .write_tx(move |conn| {
        conn.execute(
          "INSERT INTO groups (name, created_at) VALUES (?1, ?2)",
          params![name, at_str],
        )?;
        Ok(Group { id: GroupId(conn.last_insert_rowid()), name })
      })
      .await
  }

  async fn group(&self, id: GroupId) -> Result<Option<Group>> {
    self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name FROM groups WHERE id = ?1",
              params![id.0],
              group_from_row,
            )
            .optional()?,
        )
      })
      .await
  }

  async fn add_client(&self, input: NewClient) -> Result<Client> {
    let at_str = encode_dt(Utc::now());
    self
      .write_tx(move |conn| {
        if let Some(group_id) = input.group_id {
          let found = conn
            .query_row("SELECT 1 FROM groups WHERE id = ?1", params![group_id.0], |_| Ok(()))
            .optional()?;
          if found.is_none() {
            return Err(nutri_core::Error::GroupNotFound(group_id).into());
          }
        }
        conn.execute(
          "INSERT INTO clients (name, group_id, is_active, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![input.name, input.group_id.map(|g| g.0), input.is_active, at_str],
        )?;
        Ok(Client {
          id:        ClientId(conn.last_insert_rowid()),
          name:      input.name,
          group_id:  input.group_id,
          is_active: input.is_active,
        })
      })
      .await
  }

  async fn client(&self, id: ClientId) -> Result<Option<Client>> {
    self
      .read(move |conn| {
        let sql = format!("{CLIENT_SELECT} WHERE id = ?1");
        let raw = conn
          .query_row(&sql, params![id.0], RawClient::from_row)
          .optional()?;
        Ok(raw.map(RawClient::into_client))
      })
      .await
  }

  async fn set_client_active(&self, id: ClientId, is_active: bool) -> Result<Client> {
    self
      .write_tx(move |conn| {
        let changed = conn.execute(
          "UPDATE clients SET is_active = ?1 WHERE id = ?2",
          params![is_active, id.0],
        )?;
        if changed == 0 {
          return Err(nutri_core::Error::ClientNotFound(id).into());
        }
        let sql = format!("{CLIENT_SELECT} WHERE id = ?1");
        let raw = conn.query_row(&sql, params![id.0], RawClient::from_row)?;
        tracing::debug!(client = %id, is_active, "changed client activation");
        Ok(raw.into_client())
      })
      .await
  }

  async fn list_clients(&self) -> Result<Vec<Client>> {
    self
      .read(|conn| {
        let sql = format!("{CLIENT_SELECT} ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map([], RawClient::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws.into_iter().map(RawClient::into_client).collect())
      })
      .await
  }

  async fn add_template(&self, name: String, content: String) -> Result<DietTemplate> {
    nutri_core::diet::validate_content(&content)?;
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    self
      .write_tx(move |conn| {
        conn.execute(
          "INSERT INTO diet_templates (name, content, created_at) VALUES (?1, ?2, ?3)",
          params![name, content, at_str],
        )?;
        Ok(DietTemplate { id: conn.last_insert_rowid(), name, content, created_at })
      })
      .await
  }

  async fn template(&self, id: i64) -> Result<Option<DietTemplate>> {
    self
      .read(move |conn| {
        let sql = format!("{TEMPLATE_SELECT} AND id = ?1");
        conn
          .query_row(&sql, params![id], RawTemplate::from_row)
          .optional()?
          .map(RawTemplate::into_template)
          .transpose()
      })
      .await
  }

  async fn update_template(
    &self,
    id: i64,
    name: String,
    content: String,
  ) -> Result<DietTemplate> {
    nutri_core::diet::validate_content(&content)?;
    self
      .write_tx(move |conn| {
        let changed = conn.execute(
          "UPDATE diet_templates SET name = ?1, content = ?2
           WHERE id = ?3 AND deleted_at IS NULL",
          params![name, content, id],
        )?;
        if changed == 0 {
          return Err(nutri_core::Error::TemplateNotFound(id).into());
        }
        let sql = format!("{TEMPLATE_SELECT} AND id = ?1");
        conn
          .query_row(&sql, params![id], RawTemplate::from_row)?
          .into_template()
      })
      .await
  }

  async fn delete_template(&self, id: i64) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    self
      .write_tx(move |conn| {
        let changed = conn.execute(
          "UPDATE diet_templates SET deleted_at = ?1
           WHERE id = ?2 AND deleted_at IS NULL",
          params![at_str, id],
        )?;
        if changed == 0 {
          return Err(nutri_core::Error::TemplateNotFound(id).into());
        }
        tracing::debug!(id, "deleted diet template");
        Ok(())
      })
      .await
  }

  async fn list_templates(&self) -> Result<Vec<DietTemplate>> {
    self
      .read(|conn| {
        let sql = format!("{TEMPLATE_SELECT} ORDER BY name, id");
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map([], RawTemplate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawTemplate::into_template).collect()
      })
      .await
  }
}
