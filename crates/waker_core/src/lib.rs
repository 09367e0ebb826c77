pub mod notifications;
pub mod record;
pub mod store;

pub use crate::record::AlarmRecord;
pub use crate::store::AlarmStore;
