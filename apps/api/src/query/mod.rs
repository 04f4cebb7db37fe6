//! Natural-language querying of saved data: the LLM generates a SQL
//! `SELECT`, the guard vets it, and only then does it reach the store.

pub mod guard;
pub mod nl_sql;
pub mod prompts;
