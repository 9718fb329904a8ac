//! Flow tests against in-memory fakes
//!
//! Unit tests live next to the code they cover; these drive whole use
//! cases and the router end to end.

mod support;

mod invite_tests;
