pub mod postgres;
pub mod traits;

pub use postgres::PgRepo;
pub use traits::*;
