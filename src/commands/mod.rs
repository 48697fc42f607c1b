pub mod check;
pub mod latest;
pub mod record;
pub mod status;
