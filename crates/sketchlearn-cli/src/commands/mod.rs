pub(crate) mod facts;
pub(crate) mod helpers;
pub(crate) mod learn;
pub(crate) mod verify;
