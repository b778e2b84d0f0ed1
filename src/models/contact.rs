use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

use crate::schema::{contact_lists, contacts, csv_contacts, csv_files};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::ContactStatus")]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = contacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Contact {
    pub id: i32,
    pub user_id: i32,
    pub list_id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub status: ContactStatus,
    pub do_not_call: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Contact {
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = contact_lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContactList {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = csv_files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CsvFile {
    pub id: i32,
    pub user_id: i32,
    pub filename: String,
    pub row_count: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = csv_contacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CsvContact {
    pub id: i32,
    pub csv_file_id: i32,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}
