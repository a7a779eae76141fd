// Job application records: CRUD over the `jobs` table, scoped to the
// authenticated user. AI results are written only by the analysis handlers.

pub mod handlers;
pub mod store;
