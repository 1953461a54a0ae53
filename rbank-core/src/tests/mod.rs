//! Tests for register banks and instruction mappings

mod inference_tests;
