//! Domain models for register entries

mod category;
mod courrier;

pub use category::{ARRIVE_STORAGE_KEY, Category, DEPART_STORAGE_KEY};
pub use courrier::{Courrier, CourrierDraft, CourrierId, Fields, Patch, RESERVED_KEYS, STATUS_FIELD};
