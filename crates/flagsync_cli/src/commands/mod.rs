pub(crate) mod list;
pub(crate) mod meta;
pub(crate) mod run;

#[cfg(feature = "migrate")]
pub(crate) mod migrate;
