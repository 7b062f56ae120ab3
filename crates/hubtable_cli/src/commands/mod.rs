pub(crate) mod catalog;
pub(crate) mod limits;
pub(crate) mod meta;
pub(crate) mod query;
pub(crate) mod shared;
