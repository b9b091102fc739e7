//! End-to-end tests of the Weir facade
//!
//! The tests live under `e2e/` and are declared as test targets of this
//! package. The library itself holds no code.
