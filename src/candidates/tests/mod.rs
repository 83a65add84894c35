// src/candidates/tests/mod.rs

mod handlers_tests;
mod intake_tests;
