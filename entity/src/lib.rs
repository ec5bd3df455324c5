//! sea-orm entities for the clinic HR store.

pub mod attendances;
pub mod employees;
pub mod money;
pub mod salaries;
pub mod settings;
