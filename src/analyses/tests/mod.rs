// src/analyses/tests/mod.rs

mod handlers_tests;
