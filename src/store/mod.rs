//! Persistence for companies, users and the upload audit log.
//!
//! Functions take a borrowed `Connection` so callers decide the transaction
//! boundary; run them inside `Db::with_connection`.

pub mod audit;
pub mod companies;
pub mod users;

pub use audit::{log_upload, UploadRecord};
pub use companies::{
    find_by_name_key, get_company, insert_company, list_companies, update_company,
    update_poc_remarks, update_poc_status,
};
pub use users::{list_users, resolve_user, upsert_user};
