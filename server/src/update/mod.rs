pub mod comment;
pub mod post;
pub mod tag;
pub mod user;
pub mod vote;

// NOTE: Unless otherwise stated, the functions in this module do not check that the
// client has the required privileges to perform their respective actions.
// Make sure to check for privileges before calling them, if necessary.
