mod channels;
mod dms;
mod friends;
mod messages;
mod misc;
mod roles;
mod servers;
mod users;

use sqlx::PgPool;

/// Single struct implementing every capability-set trait, backed by one
/// connection pool. Services depend on the traits, not on `PgRepo` — this
/// is the only place that needs to change to swap the persistence engine.
#[derive(Clone)]
pub struct PgRepo {
    pub pool: PgPool,
}

impl PgRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
