use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{name_key, CandidatePoc, Company, Poc, PocStatus};

const SELECT_COMPANY: &str =
    "SELECT company_id, name, owner_email, profiles_json, created_at, updated_at FROM companies";

/// Company row before its POCs are attached
struct CompanyRow {
    id: String,
    name: String,
    owner_email: String,
    profiles_json: String,
    created_at: String,
    updated_at: String,
}

impl CompanyRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_email: row.get(2)?,
            profiles_json: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_company(self, conn: &Connection) -> Result<Company> {
        let profiles: Vec<String> = serde_json::from_str(&self.profiles_json)?;
        let pocs = load_pocs(conn, &self.id)?;
        Ok(Company {
            id: self.id,
            name: self.name,
            owner_email: self.owner_email,
            profiles,
            pocs,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn load_pocs(conn: &Connection, company_id: &str) -> Result<Vec<Poc>> {
    let mut stmt = conn.prepare(
        "SELECT poc_id, name, email, phone, status, remarks FROM pocs \
         WHERE company_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![company_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut pocs = Vec::new();
    for row in rows {
        let (id, name, email, phone, status, remarks) = row?;
        pocs.push(Poc {
            id,
            name,
            email,
            phone,
            status: status.parse()?,
            remarks,
        });
    }
    Ok(pocs)
}

/// Exact lookup on the normalized name key
pub fn find_by_name_key(conn: &Connection, key: &str) -> Result<Option<Company>> {
    let row = conn
        .query_row(
            &format!("{} WHERE name_key = ?1", SELECT_COMPANY),
            params![key],
            CompanyRow::from_row,
        )
        .optional()?;
    row.map(|r| r.into_company(conn)).transpose()
}

pub fn get_company(conn: &Connection, company_id: &str) -> Result<Option<Company>> {
    let row = conn
        .query_row(
            &format!("{} WHERE company_id = ?1", SELECT_COMPANY),
            params![company_id],
            CompanyRow::from_row,
        )
        .optional()?;
    row.map(|r| r.into_company(conn)).transpose()
}

/// All companies in insertion order
pub fn list_companies(conn: &Connection) -> Result<Vec<Company>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY rowid", SELECT_COMPANY))?;
    let rows = stmt
        .query_map([], CompanyRow::from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    rows.into_iter().map(|r| r.into_company(conn)).collect()
}

fn insert_pocs(conn: &Connection, company_id: &str, start: usize, pocs: &[CandidatePoc]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO pocs (poc_id, company_id, position, name, email, phone, status, remarks) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for (offset, poc) in pocs.iter().enumerate() {
        stmt.execute(params![
            Uuid::new_v4().to_string(),
            company_id,
            (start + offset) as i64,
            poc.name,
            poc.email_key(),
            poc.phone,
            poc.status.unwrap_or_default().as_str(),
            poc.remarks,
        ])?;
    }
    Ok(())
}

/// Insert a new company with its POCs; POCs without a status get the default.
pub fn insert_company(
    conn: &Connection,
    name: &str,
    owner_email: &str,
    profiles: &[String],
    pocs: &[CandidatePoc],
) -> Result<Company> {
    let company_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO companies (company_id, name, name_key, owner_email, profiles_json, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            company_id,
            name.trim(),
            name_key(name),
            owner_email,
            serde_json::to_string(profiles)?,
            now,
        ],
    )?;
    insert_pocs(conn, &company_id, 0, pocs)?;

    load_required(conn, &company_id)
}

/// Persist a merged company: replaces profiles and owner, appends new POCs.
/// Existing POC rows are never touched.
pub fn update_company(
    conn: &Connection,
    company_id: &str,
    owner_email: &str,
    profiles: &[String],
    new_pocs: &[CandidatePoc],
) -> Result<Company> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE companies SET owner_email = ?2, profiles_json = ?3, updated_at = ?4 WHERE company_id = ?1",
        params![company_id, owner_email, serde_json::to_string(profiles)?, now],
    )?;

    let start: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM pocs WHERE company_id = ?1",
        params![company_id],
        |row| row.get(0),
    )?;
    insert_pocs(conn, company_id, start as usize, new_pocs)?;

    load_required(conn, company_id)
}

fn load_required(conn: &Connection, company_id: &str) -> Result<Company> {
    get_company(conn, company_id)?.ok_or(crate::error::PocdeskError::Database(
        rusqlite::Error::QueryReturnedNoRows,
    ))
}

fn touch(conn: &Connection, company_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE companies SET updated_at = ?2 WHERE company_id = ?1",
        params![company_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Set one POC's status. `None` when the company/POC pair does not exist.
pub fn update_poc_status(
    conn: &Connection,
    company_id: &str,
    poc_id: &str,
    status: PocStatus,
) -> Result<Option<Company>> {
    let changed = conn.execute(
        "UPDATE pocs SET status = ?3 WHERE company_id = ?1 AND poc_id = ?2",
        params![company_id, poc_id, status.as_str()],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    touch(conn, company_id)?;
    get_company(conn, company_id)
}

/// Set one POC's remarks. `None` when the company/POC pair does not exist.
pub fn update_poc_remarks(
    conn: &Connection,
    company_id: &str,
    poc_id: &str,
    remarks: &str,
) -> Result<Option<Company>> {
    let changed = conn.execute(
        "UPDATE pocs SET remarks = ?3 WHERE company_id = ?1 AND poc_id = ?2",
        params![company_id, poc_id, remarks.trim()],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    touch(conn, company_id)?;
    get_company(conn, company_id)
}
