pub mod ddl;
pub mod requests;
