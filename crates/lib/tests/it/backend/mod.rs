//! Node Store tests.
//!
//! `conformance` runs against whichever store TEST_BACKEND selects;
//! `save_load` covers InMemory file persistence; `runtime` drives the SQL
//! store from inside async runtimes.

mod conformance;
mod save_load;
